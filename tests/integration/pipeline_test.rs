//! Tests for complete study runs over CSV tables

use std::fs;

use nhanes_cohort::{
    Cycle, Domain, ExclusionStage, ModelOutcome, OutputFormat, PerioStatus, Pipeline,
    PipelineError, StudyConfig, Variable,
};

use crate::utils::{data_dir, write_demo, write_older_men_cycle, write_perio_exam};

fn older_men_config(data: &std::path::Path) -> StudyConfig {
    let mut config = StudyConfig::older_men_health_days(data);
    config.cycles = Cycle::list(["B", "C"]);
    config.threads = Some(2);
    config
}

#[test]
fn test_older_men_flow_counts() {
    let dir = data_dir();
    write_older_men_cycle(dir.path(), "B", 1, 120, 11);
    // Second cycle reuses the same id space
    write_older_men_cycle(dir.path(), "C", 1, 120, 12);

    let pipeline = Pipeline::new(older_men_config(dir.path())).unwrap();
    let cohort = pipeline.build_cohort().unwrap();

    assert_eq!(cohort.cycles, Cycle::list(["B", "C"]));
    assert!(cohort.skipped_cycles.is_empty());
    assert_eq!(cohort.n_pooled, 240);

    let counts: Vec<usize> = cohort.flow.checkpoints().iter().map(|c| c.count).collect();
    // 24 men under 60, masking keeps every row, then 48 without recorded days
    assert_eq!(counts, vec![240, 216, 216, 216, 168, 168]);
    assert!(cohort.flow.is_monotonic());
    assert_eq!(cohort.records.len(), cohort.flow.final_count());
    assert_eq!(cohort.flow.count_after("Age >= 60"), Some(216));

    // Only age and physical health days exist in the written tables
    let screened: Vec<Variable> = cohort
        .flow
        .outlier_statistics
        .iter()
        .map(|s| s.variable)
        .collect();
    assert_eq!(screened, vec![Variable::Age, Variable::PhysicalHealthDays]);
    assert!(cohort.flow.outlier_statistics.iter().all(|s| s.masked && s.rejected == 0));

    // Each cycle contributes half its two-year weight
    for record in &cohort.records {
        let raw = record.raw.get(nhanes_cohort::RawField::ExamWeight).unwrap();
        assert_eq!(record.weight(), Some(raw / 2.0));
    }
}

#[test]
fn test_older_men_run_writes_outputs() {
    let dir = data_dir();
    let out = data_dir();
    write_older_men_cycle(dir.path(), "B", 1, 150, 21);
    write_older_men_cycle(dir.path(), "C", 1, 150, 22);

    let mut config = older_men_config(dir.path());
    config.output_dir = Some(out.path().to_path_buf());
    let report = Pipeline::new(config).unwrap().run().unwrap();

    for file in [
        "analytic.csv",
        "flow.json",
        "descriptive.json",
        "models.json",
        "sensitivity.json",
        "metadata.json",
    ] {
        assert!(out.path().join(file).exists(), "{file} was not written");
    }

    // Crude and demographic models only need the tables that were written
    let models = &report.regression.models;
    assert_eq!(models.len(), 6);
    assert!(models[0].summary().is_some());
    assert!(models[1].summary().is_some());
    // Fully adjusted models need covariates no table provides
    for outcome in &models[2..] {
        assert!(matches!(outcome, ModelOutcome::Failed { .. }));
    }
    assert!(report.to_string().contains("NR"));

    let metadata: serde_json::Value =
        serde_json::from_slice(&fs::read(out.path().join("metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata["n_pooled"], 300);
    assert_eq!(metadata["cycles"].as_array().unwrap().len(), 2);

    let analytic = fs::read_to_string(out.path().join("analytic.csv")).unwrap();
    assert_eq!(
        analytic.lines().count(),
        report.flow.final_count() + 1,
        "one header line plus one line per analytic record"
    );
}

#[test]
fn test_parquet_output_format() {
    let dir = data_dir();
    let out = data_dir();
    write_older_men_cycle(dir.path(), "B", 1, 60, 3);

    let mut config = older_men_config(dir.path());
    config.output_dir = Some(out.path().to_path_buf());
    config.output_format = OutputFormat::Parquet;
    Pipeline::new(config).unwrap().run().unwrap();

    assert!(out.path().join("analytic.parquet").exists());
    assert!(!out.path().join("analytic.csv").exists());
}

#[test]
fn test_missing_cycle_is_skipped() {
    let dir = data_dir();
    write_older_men_cycle(dir.path(), "C", 1, 80, 5);

    let pipeline = Pipeline::new(older_men_config(dir.path())).unwrap();
    let cohort = pipeline.build_cohort().unwrap();
    assert_eq!(cohort.cycles, Cycle::list(["C"]));
    assert_eq!(cohort.skipped_cycles, Cycle::list(["B"]));
    assert_eq!(cohort.n_pooled, 80);
}

#[test]
fn test_unavailable_outcome_stage_passes_through() {
    let dir = data_dir();
    write_demo(dir.path(), "F", &[30, 31, 32], 2000.0);

    let config = StudyConfig {
        name: "demo only".to_string(),
        loader: nhanes_cohort::LoaderConfig::new(dir.path()),
        cycles: Cycle::list(["F"]),
        domains: vec![nhanes_cohort::Domain::Demo, nhanes_cohort::Domain::Hsq],
        stages: vec![
            ExclusionStage::TotalPopulation,
            ExclusionStage::MinimumAge { years: 60.0 },
            ExclusionStage::OutcomeAvailable {
                outcome: Variable::PhysicalHealthDays,
            },
        ],
        threads: Some(1),
        ..StudyConfig::default()
    };
    let cohort = Pipeline::new(config).unwrap().build_cohort().unwrap();
    let checkpoints = cohort.flow.checkpoints();
    // Ages are 70, 71 and 72
    assert_eq!(checkpoints[1].count, 3);
    assert!(checkpoints[2].skipped);
    assert_eq!(checkpoints[2].count, 3);
}

#[test]
fn test_invalid_configs_are_rejected() {
    let dir = data_dir();

    let mut no_cycles = older_men_config(dir.path());
    no_cycles.cycles.clear();
    assert!(matches!(
        Pipeline::new(no_cycles),
        Err(PipelineError::InvalidConfig(_))
    ));

    let mut no_demo = older_men_config(dir.path());
    no_demo.domains.retain(|d| *d != nhanes_cohort::Domain::Demo);
    assert!(matches!(
        Pipeline::new(no_demo),
        Err(PipelineError::InvalidConfig(_))
    ));

    let mut zero_threads = older_men_config(dir.path());
    zero_threads.threads = Some(0);
    assert!(Pipeline::new(zero_threads).is_err());
}

#[test]
fn test_all_cycles_missing_is_fatal() {
    let dir = data_dir();
    let pipeline = Pipeline::new(older_men_config(dir.path())).unwrap();
    assert!(matches!(
        pipeline.build_cohort(),
        Err(PipelineError::NoCyclesLoaded { .. })
    ));
}

#[test]
fn test_periodontal_exam_staging_across_cycles() {
    let dir = data_dir();
    write_demo(dir.path(), "F", &[1], 3000.0);
    write_demo(dir.path(), "G", &[1], 3000.0);
    // Cycle G has no exam table at all
    write_perio_exam(
        dir.path(),
        "F",
        &[(1, 1.0, vec![("OHX02LAD", 6.0), ("OHX03LAD", 6.0), ("OHX02PCD", 5.0)])],
    );

    let config = StudyConfig {
        name: "perio staging".to_string(),
        loader: nhanes_cohort::LoaderConfig::new(dir.path()),
        cycles: Cycle::list(["F", "G"]),
        domains: vec![Domain::Demo, Domain::Ohxper],
        stages: vec![
            ExclusionStage::TotalPopulation,
            ExclusionStage::PerioExamComplete,
            ExclusionStage::CompleteCase {
                variables: vec![Variable::PerioCase],
            },
        ],
        threads: Some(1),
        ..StudyConfig::default()
    };
    let cohort = Pipeline::new(config).unwrap().build_cohort().unwrap();

    assert_eq!(cohort.n_pooled, 2);
    let counts: Vec<usize> = cohort.flow.checkpoints().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![2, 1, 1]);

    let examined = &cohort.records[0];
    assert_eq!(examined.cycle(), &Cycle::new("F"));
    assert_eq!(examined.derived.perio_status, Some(PerioStatus::Severe));
    assert_eq!(examined.derived.perio_case, Some(true));
    assert_eq!(examined.weight(), Some(1500.0));
}

#[test]
fn test_exam_without_disease_is_staged_none() {
    let dir = data_dir();
    write_demo(dir.path(), "F", &[1], 3000.0);
    write_demo(dir.path(), "G", &[1], 3000.0);
    write_perio_exam(dir.path(), "F", &[(1, 1.0, vec![("OHX02LAD", 2.0)])]);

    let config = StudyConfig {
        name: "perio complete case".to_string(),
        loader: nhanes_cohort::LoaderConfig::new(dir.path()),
        cycles: Cycle::list(["F", "G"]),
        domains: vec![Domain::Demo, Domain::Ohxper],
        stages: vec![
            ExclusionStage::TotalPopulation,
            ExclusionStage::CompleteCase {
                variables: vec![Variable::PerioCase],
            },
        ],
        threads: Some(1),
        ..StudyConfig::default()
    };
    let cohort = Pipeline::new(config).unwrap().build_cohort().unwrap();

    let counts: Vec<usize> = cohort.flow.checkpoints().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![2, 1]);
    assert_eq!(cohort.records[0].derived.perio_status, Some(PerioStatus::None));
    assert_eq!(cohort.records[0].derived.perio_case, Some(false));
}
