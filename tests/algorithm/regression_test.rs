//! Tests for model fitting over synthetic cohorts

use nhanes_cohort::algorithm::regression::{
    AdjustmentSet, DesignMatrix, ExposureGrid, FitError, GlmFit, GlmSolver, ModelStatus,
    SensitivityPlan, run_sensitivity,
};
use nhanes_cohort::models::types::Sex;
use nhanes_cohort::utils::test::{diet_cohort, older_men_cohort};
use nhanes_cohort::{Family, ModelOutcome, ModelPlan, ModelSpec, RegressionRunner, Term, Variable};

fn diet_grid() -> ExposureGrid {
    ExposureGrid {
        outcome: Variable::PerioCase,
        family: Family::BinomialLogit,
        exposures: vec![Term::Variable(Variable::Sugar), Term::Variable(Variable::Fiber)],
        adjustment_sets: vec![
            AdjustmentSet::new("Crude", Vec::new()),
            AdjustmentSet::new(
                "Adjusted",
                vec![
                    Term::Variable(Variable::Age),
                    Term::Variable(Variable::Sex),
                    Term::Variable(Variable::Race),
                ],
            ),
        ],
    }
}

#[test]
fn test_exposure_grid_over_diet_cohort() {
    let records = diet_cohort(1500, 42);
    let results = RegressionRunner::new().exposure_grid(&records, &diet_grid());

    // Exposure-major, then adjustment-set order
    let order: Vec<(&str, &str)> = results
        .iter()
        .map(|r| (r.exposure.as_str(), r.model.as_str()))
        .collect();
    assert_eq!(order.len(), 4);
    assert_eq!(order[0].0, order[1].0);
    assert_ne!(order[1].0, order[2].0);
    assert!(results.iter().all(|r| r.is_estimated()));
    assert!(results.iter().all(|r| r.n == Some(1500)));

    let sugar_crude = &results[0];
    assert_eq!(sugar_crude.family, "logistic");
    let estimate = sugar_crude.estimate.unwrap();
    assert!((0.004..0.02).contains(&estimate), "sugar log-odds {estimate}");
    assert!(sugar_crude.ratio.unwrap() > 1.0);
    assert!(sugar_crude.ratio_ci_lower.unwrap() <= sugar_crude.ratio.unwrap());
    assert!(sugar_crude.ratio.unwrap() <= sugar_crude.ratio_ci_upper.unwrap());
}

#[test]
fn test_zero_variance_exposure_is_not_reported() {
    let mut records = diet_cohort(300, 5);
    for record in &mut records {
        record.derived.sex = Some(Sex::Female);
    }
    let grid = ExposureGrid {
        exposures: vec![Term::Variable(Variable::Sex)],
        ..diet_grid()
    };
    let results = RegressionRunner::new().exposure_grid(&records, &grid);

    assert_eq!(results.len(), 2);
    for record in &results {
        assert!(!record.is_estimated());
        assert!(matches!(record.status, ModelStatus::Failed { .. }));
        assert_eq!(record.estimate, None);
        assert!(record.to_string().contains("NR"));
    }
}

#[test]
fn test_negative_binomial_rates_rise_with_conditions() {
    let records = older_men_cohort(800, 3);
    let spec = ModelSpec::new(
        "Chronic burden",
        Variable::PhysicalHealthDays,
        Family::NegativeBinomial { alpha: 1.0 },
        vec![
            Term::Variable(Variable::ChronicCategory),
            Term::Centered {
                variable: Variable::Age,
                at: 70.0,
            },
        ],
    );
    let outcome = RegressionRunner::new().fit(&records, &spec);
    let summary = outcome.summary().expect("model fitted");

    let chronic: Vec<f64> = summary
        .term_coefficients(Term::Variable(Variable::ChronicCategory))
        .map(|c| c.estimate)
        .collect();
    // Reference level "0" is absorbed in the intercept
    assert_eq!(chronic.len(), 3);
    assert!(chronic[0] > 0.0);
    assert!(chronic[2] > chronic[0]);
    assert!(summary.coefficient("age_c70").is_some());
    assert!(summary.statistics.r_squared.is_none());
}

#[test]
fn test_linear_model_reports_fit_statistics() {
    let mut records = older_men_cohort(400, 8);
    for record in records.iter_mut().take(10) {
        record.derived.physical_health_days = None;
    }
    let spec = ModelSpec::new(
        "Crude",
        Variable::PhysicalHealthDays,
        Family::Gaussian,
        vec![Term::Variable(Variable::ChronicCount)],
    );
    let outcome = RegressionRunner::new().fit(&records, &spec);
    let statistics = &outcome.summary().expect("model fitted").statistics;

    assert_eq!(statistics.n_obs, 390);
    assert_eq!(statistics.n_dropped, 10);
    let r2 = statistics.r_squared.unwrap();
    assert!((0.0..=1.0).contains(&r2));
    assert!(statistics.adj_r_squared.unwrap() <= r2);
    assert!(statistics.f_statistic.unwrap() > 0.0);
}

#[test]
fn test_too_few_rows_fail_structurally() {
    let records = older_men_cohort(4, 1);
    let spec = ModelSpec::new(
        "Overfitted",
        Variable::PhysicalHealthDays,
        Family::Gaussian,
        vec![
            Term::Variable(Variable::Age),
            Term::Variable(Variable::Bmi),
            Term::Variable(Variable::PovertyRatio),
            Term::Variable(Variable::ChronicCount),
        ],
    );
    let outcome = RegressionRunner::new().fit(&records, &spec);
    assert!(outcome.is_failed());
    assert_eq!(outcome.model(), "Overfitted");
}

#[test]
fn test_nonpositive_dispersion_fails_before_fitting() {
    let records = older_men_cohort(100, 6);
    let spec = ModelSpec::new(
        "Zero alpha",
        Variable::PhysicalHealthDays,
        Family::NegativeBinomial { alpha: 0.0 },
        vec![Term::Variable(Variable::ChronicCount)],
    );
    match RegressionRunner::new().fit(&records, &spec) {
        ModelOutcome::Failed { reason, .. } => assert!(reason.contains("alpha"), "{reason}"),
        ModelOutcome::Fitted(_) => panic!("model with alpha = 0 was fitted"),
    }
}

#[test]
fn test_categorical_outcome_is_rejected() {
    let records = older_men_cohort(50, 2);
    let spec = ModelSpec::new(
        "Bad outcome",
        Variable::AgeGroup,
        Family::Gaussian,
        vec![Term::Variable(Variable::Age)],
    );
    let design = DesignMatrix::build(&records, &spec, &Default::default());
    assert!(matches!(design, Err(FitError::InvalidOutcome { .. })));
}

struct SingularSolver;

impl GlmSolver for SingularSolver {
    fn fit(&self, _design: &DesignMatrix, _family: Family) -> Result<GlmFit, FitError> {
        Err(FitError::Singular)
    }
}

#[test]
fn test_custom_solver_failures_become_outcomes() {
    let records = diet_cohort(100, 9);
    let plan = ModelPlan {
        grid: Some(diet_grid()),
        models: vec![ModelSpec::new(
            "Sugar only",
            Variable::PerioCase,
            Family::BinomialLogit,
            vec![Term::Variable(Variable::Sugar)],
        )],
        ..ModelPlan::default()
    };
    let report = RegressionRunner::with_solver(SingularSolver).run_plan(&records, &plan);

    assert_eq!(report.grid.len(), 4);
    assert_eq!(report.models.len(), 1);
    assert!(matches!(report.models[0], ModelOutcome::Failed { .. }));
    assert_eq!(report.model_results.len(), 1);
    assert_eq!(report.n_failed(), 5);
}

#[test]
fn test_sensitivity_analyses() {
    let records = older_men_cohort(600, 13);
    let plan = SensitivityPlan {
        outcome: Variable::PhysicalHealthDays,
        exposure: Term::Variable(Variable::ChronicCategory),
        covariates: vec![Term::Centered {
            variable: Variable::Age,
            at: 70.0,
        }],
        nb_alpha: 1.0,
        stratify_by: Variable::AgeGroup,
        min_stratum_size: 200,
        alternative_exposures: vec![Variable::Diabetes, Variable::Multimorbidity],
        alternative_covariates: vec![Term::Variable(Variable::Race)],
        available_case_variables: vec![Variable::PhysicalHealthDays, Variable::Education],
        overdispersion_threshold: 1.5,
    };
    let report = run_sensitivity(&RegressionRunner::new(), &records, &plan);

    // Three dummies for each of the Poisson and negative binomial models
    assert_eq!(report.count_models.len(), 6);
    assert!(report.count_models.iter().all(|r| r.is_estimated()));
    assert_eq!(report.complete_case_n, 600);

    // Half the men report zero days and the rest are spread out
    let overdispersion = report.overdispersion.as_ref().unwrap();
    assert!(overdispersion.overdispersed);
    let zeros = report.zero_proportion.as_ref().unwrap();
    assert_eq!(zeros.n, 600);
    assert!(zeros.variance.unwrap() > zeros.mean);

    let stratum_total: usize = report.strata.iter().map(|s| s.n).sum();
    assert_eq!(stratum_total, 600);
    for stratum in &report.strata {
        let small = stratum.n < plan.min_stratum_size;
        assert_eq!(small, stratum.results.iter().all(|r| !r.is_estimated()));
    }

    let alternatives: Vec<&str> = report
        .alternative_exposures
        .iter()
        .map(|r| r.exposure.as_str())
        .collect();
    assert_eq!(alternatives.len(), 2);

    assert_eq!(report.available_cases[0].percent, 100.0);
    assert_eq!(report.available_cases[1].n_available, 0);
}
