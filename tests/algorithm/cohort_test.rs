//! Tests for the ordered exclusion pipeline

use nhanes_cohort::models::types::{EducationTier, Flossing, PhysicalActivity, Sex, SmokingStatus};
use nhanes_cohort::models::{DerivedFields, RawRecord, SubjectRecord};
use nhanes_cohort::utils::test::{diet_cohort, older_men_cohort};
use nhanes_cohort::{CohortFilter, Cycle, ExclusionStage, RawField, StudyConfig, Variable};

fn adult(id: i64, age: f64, sex: Sex, sugar: Option<f64>) -> SubjectRecord {
    let mut raw = RawRecord::new(id, Cycle::new("F"));
    raw.set(RawField::Sugar, sugar);
    SubjectRecord {
        raw,
        derived: DerivedFields {
            age: Some(age),
            sex: Some(sex),
            ..DerivedFields::default()
        },
    }
}

fn sugar_stages() -> Vec<ExclusionStage> {
    vec![
        ExclusionStage::TotalPopulation,
        ExclusionStage::MinimumAge { years: 30.0 },
        ExclusionStage::CompleteCase {
            variables: vec![Variable::Sugar],
        },
        ExclusionStage::OutlierRejection {
            variables: vec![Variable::Sugar],
            z_threshold: 4.0,
        },
    ]
}

#[test]
fn test_outlier_statistics_use_only_complete_cases() {
    let mut records: Vec<SubjectRecord> = (1..=20)
        .map(|id| adult(id, 40.0, Sex::Female, Some(10.0)))
        .collect();
    records.push(adult(21, 45.0, Sex::Male, Some(1000.0)));
    // Too young: its extreme value must not enter the statistics
    records.push(adult(22, 20.0, Sex::Male, Some(100_000.0)));
    // Missing sugar: dropped by the complete-case stage
    records.push(adult(23, 50.0, Sex::Male, None));

    let result = CohortFilter::new(sugar_stages()).unwrap().apply(records);

    let counts: Vec<usize> = result.flow.checkpoints().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![23, 22, 21, 20]);

    let stats = &result.flow.outlier_statistics[0];
    assert_eq!(stats.variable, Variable::Sugar);
    assert_eq!(stats.n, 21);
    let expected_mean = 1200.0 / 21.0;
    assert!((stats.mean.unwrap() - expected_mean).abs() < 1e-9);
    assert_eq!(stats.rejected, 1);
    assert!(result.records.iter().all(|r| r.subject_id() <= 20));
}

#[test]
fn test_checkpoints_record_exclusions() {
    let records = vec![
        adult(1, 25.0, Sex::Male, Some(5.0)),
        adult(2, 35.0, Sex::Female, Some(6.0)),
        adult(3, 45.0, Sex::Male, Some(7.0)),
        adult(4, 55.0, Sex::Male, None),
    ];
    let filter = CohortFilter::new(vec![
        ExclusionStage::TotalPopulation,
        ExclusionStage::MinimumAge { years: 30.0 },
        ExclusionStage::Sex { sex: Sex::Male },
        ExclusionStage::CompleteCase {
            variables: vec![Variable::Sugar],
        },
    ])
    .unwrap();
    let flow = filter.apply(records).flow;

    let excluded: Vec<usize> = flow.checkpoints().iter().map(|c| c.excluded).collect();
    assert_eq!(excluded, vec![0, 1, 1, 1]);
    assert_eq!(flow.initial_count(), 4);
    assert_eq!(flow.final_count(), 1);
    assert_eq!(flow.count_after("Total population"), Some(4));
    assert!(flow.is_monotonic());
}

#[test]
fn test_flow_is_monotonic_over_a_synthetic_cohort() {
    let mut records = older_men_cohort(400, 17);
    for record in records.iter_mut().step_by(7) {
        record.derived.physical_health_days = None;
    }
    let filter = CohortFilter::new(vec![
        ExclusionStage::TotalPopulation,
        ExclusionStage::MinimumAge { years: 65.0 },
        ExclusionStage::OutcomeAvailable {
            outcome: Variable::PhysicalHealthDays,
        },
        ExclusionStage::CompleteCase {
            variables: vec![Variable::ChronicCount, Variable::Age, Variable::Weight],
        },
        ExclusionStage::OutlierRejection {
            variables: vec![Variable::PhysicalHealthDays],
            z_threshold: 2.0,
        },
    ])
    .unwrap();
    let result = filter.apply(records);

    assert!(result.flow.is_monotonic());
    assert_eq!(result.flow.initial_count(), 400);
    assert_eq!(result.records.len(), result.flow.final_count());
    assert!(
        result
            .records
            .iter()
            .all(|r| r.derived.age.unwrap() >= 65.0 && r.derived.physical_health_days.is_some())
    );
}

#[test]
fn test_stages_from_json() {
    let json = r#"[
        {"stage": "total_population"},
        {"stage": "minimum_age", "years": 60},
        {"stage": "complete_case", "variables": ["age"]},
        {"stage": "outlier_rejection", "variables": ["age"]}
    ]"#;
    let stages: Vec<ExclusionStage> = serde_json::from_str(json).unwrap();
    assert_eq!(stages[1], ExclusionStage::MinimumAge { years: 60.0 });
    assert_eq!(
        stages[3],
        ExclusionStage::OutlierRejection {
            variables: vec![Variable::Age],
            z_threshold: 4.0,
        }
    );
    assert!(CohortFilter::new(stages).is_ok());
}

#[test]
fn test_outlier_stage_before_complete_case_is_rejected() {
    let mut stages = sugar_stages();
    stages.swap(2, 3);
    assert!(CohortFilter::new(stages).is_err());
}

#[test]
fn test_outlier_in_incomplete_row_does_not_shift_statistics() {
    let mut records: Vec<SubjectRecord> = (1..=20)
        .map(|id| {
            let mut record = adult(id, 40.0, Sex::Female, Some(10.0 + (id % 3) as f64));
            record.derived.bmi = Some(25.0);
            record
        })
        .collect();
    // Extreme sugar, but no BMI: removed before the screen runs
    records.push(adult(21, 45.0, Sex::Male, Some(1_000_000.0)));

    let filter = CohortFilter::new(vec![
        ExclusionStage::TotalPopulation,
        ExclusionStage::CompleteCase {
            variables: vec![Variable::Sugar, Variable::Bmi],
        },
        ExclusionStage::OutlierRejection {
            variables: vec![Variable::Sugar],
            z_threshold: 4.0,
        },
    ])
    .unwrap();
    let result = filter.apply(records);

    let counts: Vec<usize> = result.flow.checkpoints().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![21, 20, 20]);

    let stats = &result.flow.outlier_statistics[0];
    assert_eq!(stats.n, 20);
    let expected_mean = (1..=20).map(|id| 10.0 + (id % 3) as f64).sum::<f64>() / 20.0;
    assert!((stats.mean.unwrap() - expected_mean).abs() < 1e-9);
    assert_eq!(stats.rejected, 0);
}

#[test]
fn test_masked_values_drop_rows_at_later_stages() {
    let mut records = older_men_cohort(200, 31);
    records[0].derived.bmi = Some(400.0);
    records[1].derived.physical_health_days = Some(1000.0);

    let filter = CohortFilter::new(vec![
        ExclusionStage::TotalPopulation,
        ExclusionStage::OutlierMasking {
            variables: vec![Variable::Bmi, Variable::PhysicalHealthDays],
            z_threshold: 4.0,
        },
        ExclusionStage::OutcomeAvailable {
            outcome: Variable::PhysicalHealthDays,
        },
        ExclusionStage::CompleteCase {
            variables: vec![Variable::Bmi, Variable::Age],
        },
    ])
    .unwrap();
    let result = filter.apply(records);

    let counts: Vec<usize> = result.flow.checkpoints().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![200, 200, 199, 198]);
    assert_eq!(result.flow.checkpoints()[1].excluded, 0);

    let statistics = &result.flow.outlier_statistics;
    assert_eq!(statistics.len(), 2);
    assert!(statistics.iter().all(|s| s.masked && s.rejected == 1));
    assert!(result.records.iter().all(|r| r.subject_id() > 2));
}

#[test]
fn test_diet_study_stages_over_synthetic_cohort() {
    let mut records = diet_cohort(400, 21);
    for (idx, record) in records.iter_mut().enumerate() {
        let exam = if idx % 10 == 9 { 2.0 } else { 1.0 };
        let recall = if idx % 20 == 3 { 4.0 } else { 1.0 };
        record.raw.set(RawField::PerioExamStatus, Some(exam));
        record.raw.set(RawField::DietRecallStatus, Some(recall));

        let derived = &mut record.derived;
        derived.education_tier = Some(EducationTier::AboveHighSchool);
        derived.smoking = Some(SmokingStatus::Never);
        derived.diabetes = Some(false);
        derived.alcohol = Some(0.0);
        derived.physical_activity = Some(PhysicalActivity::Active);
        derived.flossing = Some(Flossing::Daily);
        derived.poverty_ratio = Some(2.0);
        derived.bmi = (idx % 25 != 7).then_some(25.0);
    }
    records[0].derived.age = Some(25.0);
    records[5].raw.set(RawField::Energy, Some(60_000.0));

    let config = StudyConfig::diet_periodontitis("/data");
    let result = CohortFilter::new(config.stages).unwrap().apply(records);

    let counts: Vec<usize> = result.flow.checkpoints().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![400, 399, 359, 339, 323, 322]);
    assert!(result.flow.is_monotonic());

    let energy = result
        .flow
        .outlier_statistics
        .iter()
        .find(|s| s.variable == Variable::Energy)
        .unwrap();
    assert_eq!(energy.rejected, 1);
    assert_eq!(energy.n, 323);
    assert!(result.records.iter().all(|r| r.subject_id() != 6));
}
