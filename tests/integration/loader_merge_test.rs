//! Tests for table loading, cycle merging and record extraction

use std::fs;

use nhanes_cohort::models::extract_records;
use nhanes_cohort::{
    Cycle, CycleMerger, DeriveConfig, Domain, PipelineError, RawField, TableLoader, derive_all,
};

use crate::utils::{data_dir, loader_config, write_demo, write_diet};

#[test]
fn test_two_cycles_share_id_space() {
    let dir = data_dir();
    write_demo(dir.path(), "F", &[1, 2, 3], 3000.0);
    write_demo(dir.path(), "G", &[1, 2, 3], 6000.0);
    write_diet(dir.path(), "F", &[1, 2, 3]);

    let merger = CycleMerger::new(
        TableLoader::new(loader_config(dir.path())),
        Cycle::list(["F", "G"]),
        vec![Domain::Demo, Domain::Dr1Tot],
    );
    let pooled = merger.pool().unwrap();
    assert_eq!(pooled.num_rows(), 6);
    assert_eq!(pooled.n_cycles(), 2);
    assert_eq!(
        pooled.cycle_rows,
        vec![(Cycle::new("F"), 3), (Cycle::new("G"), 3)]
    );

    let records = extract_records(&pooled).unwrap();
    assert_eq!(records.len(), 6);

    // Subject 1 exists in both cycles as two distinct records
    let first: Vec<_> = records.iter().filter(|r| r.subject_id == 1).collect();
    assert_eq!(first.len(), 2);
    let in_f = first.iter().find(|r| r.cycle == Cycle::new("F")).unwrap();
    let in_g = first.iter().find(|r| r.cycle == Cycle::new("G")).unwrap();
    assert_eq!(in_f.get(RawField::Sugar), Some(10.0));
    // Cycle G has no dietary table, so its dietary fields are missing
    assert_eq!(in_g.get(RawField::Sugar), None);
    assert_eq!(in_g.get(RawField::Age), Some(41.0));

    let derived = derive_all(records, &DeriveConfig::default().with_cycles(pooled.n_cycles()));
    let weights: Vec<Option<f64>> = derived.iter().map(|r| r.weight()).collect();
    assert_eq!(&weights[..3], &[Some(1500.0); 3]);
    assert_eq!(&weights[3..], &[Some(3000.0); 3]);
}

#[test]
fn test_missing_demo_skips_cycle() {
    let dir = data_dir();
    write_demo(dir.path(), "F", &[1, 2], 1000.0);
    write_diet(dir.path(), "G", &[1, 2]);

    let merger = CycleMerger::new(
        TableLoader::new(loader_config(dir.path())),
        Cycle::list(["F", "G"]),
        vec![Domain::Demo, Domain::Dr1Tot],
    );
    let pooled = merger.pool().unwrap();
    assert_eq!(pooled.cycles, vec![Cycle::new("F")]);
    assert_eq!(pooled.skipped_cycles, vec![Cycle::new("G")]);
    assert_eq!(pooled.num_rows(), 2);
    // DR1TOT is absent from every included cycle
    assert!(pooled.unavailable_fields().contains(&RawField::Sugar));
    assert!(!pooled.unavailable_fields().contains(&RawField::Age));
}

#[test]
fn test_no_cycles_loaded_is_fatal() {
    let dir = data_dir();
    let merger = CycleMerger::new(
        TableLoader::new(loader_config(dir.path())),
        Cycle::list(["F"]),
        vec![Domain::Demo],
    );
    assert!(matches!(
        merger.pool(),
        Err(PipelineError::NoCyclesLoaded { .. })
    ));
}

#[test]
fn test_table_without_subject_id_is_schema_error() {
    let dir = data_dir();
    fs::write(dir.path().join("DEMO_F.csv"), "RIDAGEYR,RIAGENDR\n50,1\n").unwrap();

    let loader = TableLoader::new(loader_config(dir.path()));
    assert!(matches!(
        loader.load(Domain::Demo, &Cycle::new("F")),
        Err(PipelineError::Schema { .. })
    ));
}

#[test]
fn test_file_and_column_names_are_case_insensitive() {
    let dir = data_dir();
    fs::write(dir.path().join("demo_f.csv"), "seqn,ridageyr\n7,50\n8,61\n").unwrap();

    let loader = TableLoader::new(loader_config(dir.path()));
    let table = loader.load(Domain::Demo, &Cycle::new("F")).unwrap().unwrap();
    assert_eq!(table.num_rows(), 2);
    assert!(table.batch.column_by_name("RIDAGEYR").is_some());
}

#[test]
fn test_duplicate_right_ids_keep_first_row() {
    let dir = data_dir();
    write_demo(dir.path(), "F", &[1, 2], 1000.0);
    fs::write(
        dir.path().join("DR1TOT_F.csv"),
        "SEQN,DR1TSUGR\n1,5\n1,99\n2,7\n",
    )
    .unwrap();

    let merger = CycleMerger::new(
        TableLoader::new(loader_config(dir.path())),
        Cycle::list(["F"]),
        vec![Domain::Demo, Domain::Dr1Tot],
    );
    let pooled = merger.pool().unwrap();
    assert_eq!(pooled.num_rows(), 2);
    let records = extract_records(&pooled).unwrap();
    assert_eq!(records[0].get(RawField::Sugar), Some(5.0));
    assert_eq!(records[1].get(RawField::Sugar), Some(7.0));
}
