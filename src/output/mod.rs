//! Output artifacts of a study run
//!
//! The analytic sample is flattened into [`AnalyticRow`]s and converted to an
//! Arrow batch with `serde_arrow`, then written as CSV or Parquet. Flow,
//! descriptive and model results are written as JSON.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use log::info;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::error::util::ensure_output_dir;
use crate::models::{SubjectRecord, Variable};
use crate::schema::{Cycle, RawField};

/// One row of the analytic table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticRow {
    pub subject_id: i64,
    pub cycle: String,
    pub weight: Option<f64>,
    pub stratum: Option<f64>,
    pub psu: Option<f64>,
    pub age: Option<f64>,
    pub age_group: Option<String>,
    pub sex: Option<String>,
    pub race: Option<String>,
    pub education: Option<String>,
    pub education_tier: Option<String>,
    pub marital_status: Option<String>,
    pub poverty_ratio: Option<f64>,
    pub has_insurance: Option<f64>,
    pub smoking: Option<String>,
    pub alcohol: Option<f64>,
    pub physical_activity: Option<String>,
    pub activity_level: Option<String>,
    pub flossing: Option<String>,
    pub bmi: Option<f64>,
    pub bmi_category: Option<String>,
    pub waist_circumference: Option<f64>,
    pub diabetes: Option<f64>,
    pub hypertension: Option<f64>,
    pub high_cholesterol: Option<f64>,
    pub cvd: Option<f64>,
    pub chronic_count: Option<f64>,
    pub chronic_category: Option<String>,
    pub any_chronic: Option<f64>,
    pub multimorbidity: Option<f64>,
    pub perio_status: Option<String>,
    pub perio_case: Option<f64>,
    pub energy: Option<f64>,
    pub sugar: Option<f64>,
    pub fiber: Option<f64>,
    pub vitamin_c: Option<f64>,
    pub calcium: Option<f64>,
    pub physical_health_days: Option<f64>,
    pub mental_health_days: Option<f64>,
    pub activity_limitation_days: Option<f64>,
    pub general_health: Option<String>,
}

impl From<&SubjectRecord> for AnalyticRow {
    fn from(record: &SubjectRecord) -> Self {
        let number = |v: Variable| record.value(v).as_number();
        let label = |v: Variable| record.value(v).as_category().map(str::to_string);
        Self {
            subject_id: record.subject_id(),
            cycle: record.cycle().as_str().to_string(),
            weight: number(Variable::Weight),
            stratum: number(Variable::Stratum),
            psu: number(Variable::Psu),
            age: number(Variable::Age),
            age_group: label(Variable::AgeGroup),
            sex: label(Variable::Sex),
            race: label(Variable::Race),
            education: label(Variable::Education),
            education_tier: label(Variable::EducationTier),
            marital_status: label(Variable::MaritalStatus),
            poverty_ratio: number(Variable::PovertyRatio),
            has_insurance: number(Variable::HasInsurance),
            smoking: label(Variable::Smoking),
            alcohol: number(Variable::Alcohol),
            physical_activity: label(Variable::PhysicalActivity),
            activity_level: label(Variable::ActivityLevel),
            flossing: label(Variable::Flossing),
            bmi: number(Variable::Bmi),
            bmi_category: label(Variable::BmiCategory),
            waist_circumference: number(Variable::WaistCircumference),
            diabetes: number(Variable::Diabetes),
            hypertension: number(Variable::Hypertension),
            high_cholesterol: number(Variable::HighCholesterol),
            cvd: number(Variable::Cvd),
            chronic_count: number(Variable::ChronicCount),
            chronic_category: label(Variable::ChronicCategory),
            any_chronic: number(Variable::AnyChronic),
            multimorbidity: number(Variable::Multimorbidity),
            perio_status: label(Variable::PerioStatus),
            perio_case: number(Variable::PerioCase),
            energy: number(Variable::Energy),
            sugar: number(Variable::Sugar),
            fiber: number(Variable::Fiber),
            vitamin_c: number(Variable::VitaminC),
            calcium: number(Variable::Calcium),
            physical_health_days: number(Variable::PhysicalHealthDays),
            mental_health_days: number(Variable::MentalHealthDays),
            activity_limitation_days: number(Variable::ActivityLimitationDays),
            general_health: label(Variable::GeneralHealth),
        }
    }
}

/// Convert the analytic sample to an Arrow batch
pub fn analytic_batch(records: &[SubjectRecord]) -> Result<RecordBatch> {
    let rows: Vec<AnalyticRow> = records.iter().map(AnalyticRow::from).collect();
    let fields = Vec::<FieldRef>::from_type::<AnalyticRow>(
        TracingOptions::default().allow_null_fields(true),
    )?;
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

/// Write the analytic sample as CSV with a header row
pub fn write_analytic_csv(records: &[SubjectRecord], path: &Path) -> Result<()> {
    let batch = analytic_batch(records)?;
    let file = File::create(path)?;
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));
    writer.write(&batch)?;
    info!("Wrote {} analytic rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Write the analytic sample as Parquet
pub fn write_analytic_parquet(records: &[SubjectRecord], path: &Path) -> Result<()> {
    let batch = analytic_batch(records)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    info!("Wrote {} analytic rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Write the analytic sample into a directory in the chosen format
pub fn write_analytic(
    records: &[SubjectRecord],
    dir: &Path,
    format: OutputFormat,
) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = match format {
        OutputFormat::Csv => dir.join("analytic.csv"),
        OutputFormat::Parquet => dir.join("analytic.parquet"),
    };
    match format {
        OutputFormat::Csv => write_analytic_csv(records, &path)?,
        OutputFormat::Parquet => write_analytic_parquet(records, &path)?,
    }
    Ok(path)
}

/// Write any serializable value as pretty JSON
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Description of a run written next to its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Study name
    pub study: String,
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Pooled cycles
    pub cycles: Vec<Cycle>,
    /// Configured cycles that could not be loaded
    pub skipped_cycles: Vec<Cycle>,
    /// Rows in the pooled table
    pub n_pooled: usize,
    /// Rows in the analytic sample
    pub n_analytic: usize,
    /// Raw fields absent from every pooled cycle
    pub unavailable_fields: Vec<RawField>,
    /// Percent missing per variable in the analytic sample
    pub missing_percent: BTreeMap<Variable, f64>,
}

impl RunMetadata {
    /// Percent of records missing each variable
    #[must_use]
    pub fn missing_percentages(
        records: &[SubjectRecord],
        variables: &[Variable],
    ) -> BTreeMap<Variable, f64> {
        variables
            .iter()
            .map(|variable| {
                let missing = records.iter().filter(|r| r.is_missing(*variable)).count();
                let percent = if records.is_empty() {
                    0.0
                } else {
                    missing as f64 / records.len() as f64 * 100.0
                };
                (*variable, percent)
            })
            .collect()
    }
}
