//! Tests for survey-weighted descriptive statistics

use nhanes_cohort::algorithm::descriptive::{
    CategoricalSummary, ContinuousSummary, OutcomeSummary, OutcomeThreshold,
    table::OVERALL, weighted_mean, weighted_median, weighted_percentages, weighted_sd,
};
use nhanes_cohort::models::types::{AgeGroup, ChronicCategory};
use nhanes_cohort::models::{DerivedFields, RawRecord, SubjectRecord};
use nhanes_cohort::utils::test::older_men_cohort;
use nhanes_cohort::{Cycle, DescriptivePlan, DescriptiveReport, Variable};

fn man(id: i64, age: f64, days: Option<f64>, weight: Option<f64>) -> SubjectRecord {
    SubjectRecord {
        raw: RawRecord::new(id, Cycle::new("J")),
        derived: DerivedFields {
            age: Some(age),
            age_group: nhanes_cohort::algorithm::derive::recode::age_group(Some(age)),
            physical_health_days: days,
            weight,
            ..DerivedFields::default()
        },
    }
}

#[test]
fn test_equal_weight_median_is_lower_middle_value() {
    let values = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
    let weights = [Some(1.0); 4];
    assert_eq!(weighted_median(&values, &weights), Some(2.0));
    assert_eq!(weighted_mean(&values, &weights), Some(2.5));
}

#[test]
fn test_weights_shift_the_median() {
    let values = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
    let weights = [Some(1.0), Some(1.0), Some(1.0), Some(10.0)];
    assert_eq!(weighted_median(&values, &weights), Some(4.0));
}

#[test]
fn test_missing_and_nonpositive_weights_are_ignored() {
    let values = [Some(10.0), Some(20.0), None, Some(1000.0), Some(1000.0)];
    let weights = [Some(2.0), Some(2.0), Some(5.0), Some(0.0), None];
    assert_eq!(weighted_mean(&values, &weights), Some(15.0));

    let nothing = [None, None];
    assert_eq!(weighted_mean(&nothing, &[Some(1.0), Some(1.0)]), None);
    assert_eq!(weighted_sd(&[Some(3.0)], &[Some(1.0)]), None);
}

#[test]
fn test_percentages_sum_to_one_hundred() {
    let categories = [Some("A"), Some("B"), None, Some("A"), Some("C")];
    let weights = [Some(1.0), Some(2.0), Some(50.0), Some(3.0), Some(4.0)];
    let shares = weighted_percentages(&categories, &weights).unwrap();

    let labels: Vec<&str> = shares.iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, vec!["A", "B", "C"]);
    let total: f64 = shares.iter().map(|(_, pct)| pct).sum();
    assert!((total - 100.0).abs() < 1e-9);
    assert!((shares[0].1 - 40.0).abs() < 1e-9);
}

#[test]
fn test_categorical_summary_lists_every_declared_level() {
    let records = vec![
        man(1, 65.0, Some(0.0), Some(100.0)),
        man(2, 66.0, Some(3.0), Some(100.0)),
        man(3, 85.0, Some(20.0), Some(200.0)),
        man(4, 55.0, Some(1.0), Some(500.0)),
    ];
    let summary = CategoricalSummary::compute(&records, Variable::AgeGroup);

    assert_eq!(summary.levels.len(), AgeGroup::LABELS.len());
    assert_eq!(summary.n_missing, 1);
    assert_eq!(summary.level("60-69").unwrap().n, 2);
    assert_eq!(summary.level("70-79").unwrap().n, 0);
    assert_eq!(summary.level("70-79").unwrap().percent, Some(0.0));
    assert_eq!(summary.level("60-69").unwrap().percent, Some(50.0));
}

#[test]
fn test_outcome_threshold_counts() {
    let records = vec![
        man(1, 65.0, Some(0.0), Some(1.0)),
        man(2, 66.0, Some(14.0), Some(1.0)),
        man(3, 70.0, Some(30.0), Some(2.0)),
        man(4, 71.0, None, Some(9.0)),
    ];
    let summary =
        OutcomeSummary::compute(&records, OutcomeThreshold::new(Variable::PhysicalHealthDays, 14.0));
    assert_eq!(summary.n_zero, 1);
    assert_eq!(summary.n_at_or_above, 2);
    assert_eq!(summary.percent_at_or_above, Some(75.0));
    assert_eq!(summary.summary.n, 3);
}

#[test]
fn test_continuous_summary_quartiles_are_ordered() {
    let records = older_men_cohort(300, 4);
    let summary = ContinuousSummary::compute(&records, Variable::Age);
    let (q1, median, q3) = (
        summary.q1.unwrap(),
        summary.median.unwrap(),
        summary.q3.unwrap(),
    );
    assert!(q1 <= median && median <= q3);
    assert!((60.0..=85.0).contains(&summary.mean.unwrap()));
    assert_eq!(summary.n, 300);
}

#[test]
fn test_stratified_table_has_overall_and_level_columns() {
    let records = older_men_cohort(200, 9);
    let plan = DescriptivePlan {
        stratify_by: Some(Variable::ChronicCategory),
        continuous: vec![Variable::Age, Variable::PhysicalHealthDays],
        categorical: vec![Variable::AgeGroup, Variable::Diabetes],
        outcomes: vec![OutcomeThreshold::new(Variable::PhysicalHealthDays, 14.0)],
    };
    let report = DescriptiveReport::build(&records, &plan);

    let columns = &report.table.columns;
    assert_eq!(columns.len(), 1 + ChronicCategory::LABELS.len());
    assert_eq!(columns[0].stratum, OVERALL);
    let stratum_total: usize = columns[1..].iter().map(|c| c.n).sum();
    assert_eq!(stratum_total, columns[0].n);

    let diabetes = &report.table.column(OVERALL).unwrap().categorical[1];
    let pct: f64 = diabetes.levels.iter().filter_map(|l| l.percent).sum();
    assert!((pct - 100.0).abs() < 1e-9);
    assert_eq!(report.outcomes.len(), 1);
}
