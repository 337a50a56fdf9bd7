//! Typed extraction from the pooled table
//!
//! Columns are resolved against the pooled schema once, cast to `Float64`
//! with unparsable values as nulls, and then every row becomes a
//! [`RawRecord`].

use arrow::array::{Array, AsArray};
use log::{info, warn};
use rayon::prelude::*;

use crate::algorithm::merge::PooledTable;
use crate::error::{PipelineError, Result};
use crate::models::record::{PerioExam, RawRecord};
use crate::schema::perio::exam_columns;
use crate::schema::{CYCLE_COLUMN, Cycle, InterproximalSite, PerioMeasure, RawField, SUBJECT_ID_COLUMN};
use crate::utils::arrow::{float_column, int_keys};

type Column = Vec<Option<f64>>;

/// Resolve a raw field, coalescing the primary column with its fallback
fn resolve_field(table: &PooledTable, field: RawField) -> Result<Option<Column>> {
    let mut resolved: Option<Column> = None;
    for candidate in field.column_candidates() {
        let Some(values) = float_column(&table.batch, candidate)? else {
            continue;
        };
        resolved = Some(match resolved {
            None => values,
            Some(primary) => primary
                .into_iter()
                .zip(values)
                .map(|(primary, fallback)| primary.or(fallback))
                .collect(),
        });
    }
    Ok(resolved)
}

/// Turn every pooled row into a [`RawRecord`]
///
/// Rows without a subject id are dropped with a warning. Fields absent from
/// every cycle stay missing on every record.
pub fn extract_records(table: &PooledTable) -> Result<Vec<RawRecord>> {
    let batch = &table.batch;
    let ids = int_keys(batch, SUBJECT_ID_COLUMN)?;
    let cycles = batch
        .column_by_name(CYCLE_COLUMN)
        .ok_or_else(|| PipelineError::schema("pooled table", format!("{CYCLE_COLUMN} column missing")))?
        .as_string_opt::<i32>()
        .ok_or_else(|| PipelineError::schema("pooled table", format!("{CYCLE_COLUMN} is not text")))?
        .clone();

    let mut fields: Vec<(RawField, Column)> = Vec::with_capacity(RawField::COUNT);
    for field in RawField::ALL {
        if let Some(values) = resolve_field(table, field)? {
            fields.push((field, values));
        }
    }

    let mut perio: Vec<(PerioMeasure, usize, InterproximalSite, Column)> = Vec::new();
    for (measure, tooth_idx, site, name) in exam_columns() {
        if let Some(values) = float_column(batch, &name)? {
            perio.push((measure, tooth_idx, site, values));
        }
    }
    info!(
        "Resolved {} of {} raw fields and {} exam columns",
        fields.len(),
        RawField::COUNT,
        perio.len()
    );

    let records: Vec<Option<RawRecord>> = (0..batch.num_rows())
        .into_par_iter()
        .map(|row| {
            let subject_id = ids[row]?;
            let cycle = Cycle::new(cycles.is_valid(row).then(|| cycles.value(row))?);
            let mut record = RawRecord::new(subject_id, cycle);
            for (field, values) in &fields {
                record.set(*field, values[row]);
            }
            if !perio.is_empty() {
                let mut exam = PerioExam::default();
                for (measure, tooth_idx, site, values) in &perio {
                    exam.set_at(*measure, *tooth_idx, *site, values[row]);
                }
                record.perio = exam;
            }
            Some(record)
        })
        .collect();

    let total = records.len();
    let records: Vec<RawRecord> = records.into_iter().flatten().collect();
    if records.len() < total {
        warn!(
            "Dropped {} pooled rows without a subject id or cycle",
            total - records.len()
        );
    }
    Ok(records)
}
