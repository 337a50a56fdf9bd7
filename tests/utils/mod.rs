use std::path::Path;

use nhanes_cohort::utils::test::{CsvTable, demo_table};
use nhanes_cohort::{Domain, LoaderConfig, RawField};
use rand::prelude::*;
use tempfile::TempDir;

/// Fresh data directory for one test
#[must_use]
pub fn data_dir() -> TempDir {
    tempfile::tempdir().expect("create temp data dir")
}

/// Loader configuration pointing at a data directory
#[must_use]
pub fn loader_config(dir: &Path) -> LoaderConfig {
    LoaderConfig::new(dir)
}

/// Write a DEMO table with unit-spaced ages, every subject male
pub fn write_demo(dir: &Path, cycle: &str, ids: &[i64], weight: f64) {
    let ages: Vec<f64> = ids.iter().map(|id| 40.0 + *id as f64).collect();
    let sexes = vec![1.0; ids.len()];
    let weights = vec![weight; ids.len()];
    demo_table(cycle, ids, &ages, &sexes, &weights)
        .write(dir)
        .expect("write DEMO");
}

/// Write a day-one dietary table with sugar = 10 * id
pub fn write_diet(dir: &Path, cycle: &str, ids: &[i64]) {
    let sugar: Vec<f64> = ids.iter().map(|id| 10.0 * *id as f64).collect();
    let status = vec![1.0; ids.len()];
    CsvTable::new(Domain::Dr1Tot, cycle, ids)
        .values(RawField::Sugar, &sugar)
        .values(RawField::DietRecallStatus, &status)
        .write(dir)
        .expect("write DR1TOT");
}

/// Write DEMO, HSQ, DIQ, BPQ and CDQ tables for `n` older men in one cycle
///
/// Ids start at `first_id`; a fifth of the men have no recorded unhealthy
/// days, and one in ten is younger than 60. Recorded days stay within three
/// standard deviations of their mean, so outlier masking leaves them intact.
pub fn write_older_men_cycle(dir: &Path, cycle: &str, first_id: i64, n: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let ids: Vec<i64> = (first_id..first_id + n as i64).collect();

    let mut ages = Vec::with_capacity(n);
    let mut races = Vec::with_capacity(n);
    let mut strata = Vec::with_capacity(n);
    let mut psus = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);
    let mut days = Vec::with_capacity(n);
    let mut diabetes = Vec::with_capacity(n);
    let mut hypertension = Vec::with_capacity(n);
    let mut cholesterol = Vec::with_capacity(n);
    let mut chest = Vec::with_capacity(n);
    let mut severe = Vec::with_capacity(n);

    for (i, _) in ids.iter().enumerate() {
        let age = if i % 10 == 0 {
            55.0
        } else {
            f64::from(rng.random_range(60..=85_u8))
        };
        ages.push(Some(age));
        races.push(Some(f64::from(rng.random_range(1..=5_u8))));
        strata.push(Some(f64::from(rng.random_range(1..=15_u8))));
        psus.push(Some(f64::from(rng.random_range(1..=2_u8))));
        weights.push(Some(rng.random_range(1000.0..20000.0_f64).round()));

        let conditions = [
            rng.random_bool(0.3),
            rng.random_bool(0.5),
            rng.random_bool(0.4),
        ];
        let count = conditions.iter().filter(|c| **c).count();
        let yes_no = |c: bool| Some(if c { 1.0 } else { 2.0 });
        diabetes.push(yes_no(conditions[0]));
        hypertension.push(yes_no(conditions[1]));
        cholesterol.push(yes_no(conditions[2]));
        chest.push(Some(2.0));
        severe.push(Some(2.0));

        days.push(if i % 5 == 4 {
            None
        } else if rng.random_bool(0.4) {
            Some(0.0)
        } else {
            Some(f64::from(rng.random_range(1..=5_u8)) + 3.0 * count as f64)
        });
    }

    CsvTable::new(Domain::Demo, cycle, &ids)
        .field(RawField::Age, ages)
        .values(RawField::Sex, &vec![1.0; n])
        .field(RawField::RaceEthnicity, races)
        .field(RawField::Stratum, strata)
        .field(RawField::Psu, psus)
        .field(RawField::ExamWeight, weights)
        .write(dir)
        .expect("write DEMO");
    CsvTable::new(Domain::Hsq, cycle, &ids)
        .field(RawField::PhysicalUnhealthyDays, days)
        .write(dir)
        .expect("write HSQ");
    CsvTable::new(Domain::Diq, cycle, &ids)
        .field(RawField::DiabetesDiagnosis, diabetes)
        .write(dir)
        .expect("write DIQ");
    CsvTable::new(Domain::Bpq, cycle, &ids)
        .field(RawField::Hypertension, hypertension)
        .field(RawField::HighCholesterol, cholesterol)
        .write(dir)
        .expect("write BPQ");
    CsvTable::new(Domain::Cdq, cycle, &ids)
        .field(RawField::ChestPain, chest)
        .field(RawField::SevereChestPain, severe)
        .write(dir)
        .expect("write CDQ");
}

/// Write a periodontal exam table with lower-case headers
///
/// Each row is `(id, exam status, measurements)`, measurements keyed by
/// their upper-case column name; columns absent from a row are left empty.
pub fn write_perio_exam(dir: &Path, cycle: &str, rows: &[(i64, f64, Vec<(&str, f64)>)]) {
    let mut columns: Vec<&str> = Vec::new();
    for (_, _, measurements) in rows {
        for &(column, _) in measurements {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }

    let mut header = vec![
        "seqn".to_string(),
        RawField::PerioExamStatus.column().to_lowercase(),
    ];
    header.extend(columns.iter().map(|column| column.to_lowercase()));
    let mut text = header.join(",");
    text.push('\n');

    for (id, status, measurements) in rows {
        let mut cells = vec![id.to_string(), status.to_string()];
        for column in &columns {
            cells.push(
                measurements
                    .iter()
                    .find(|(name, _)| name == column)
                    .map_or_else(String::new, |(_, value)| value.to_string()),
            );
        }
        text.push_str(&cells.join(","));
        text.push('\n');
    }
    std::fs::write(dir.join(format!("OHXPER_{cycle}.csv")), text).expect("write OHXPER");
}
