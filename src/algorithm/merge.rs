//! Cycle merging and pooling
//!
//! Every domain table of a cycle is left-joined onto the cycle's `DEMO` table
//! on `SEQN`, so the merged table has exactly one row per `DEMO` row. The
//! merged cycles are then brought to a common schema and concatenated into a
//! single pooled table with a `CYCLE` provenance column.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, ArrayRef, StringArray, UInt32Array, new_null_array};
use arrow::compute::kernels::cast::cast;
use arrow::compute::{concat_batches, take};
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{PipelineError, Result};
use crate::loader::TableLoader;
use crate::schema::{CYCLE_COLUMN, Cycle, Domain, RawField, SUBJECT_ID_COLUMN};
use crate::utils::arrow::{column_names, int_keys};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_recovery};

/// Cycles pooled into one table
#[derive(Debug, Clone)]
pub struct PooledTable {
    /// Concatenated rows of every included cycle
    pub batch: RecordBatch,
    /// Included cycles, in configuration order
    pub cycles: Vec<Cycle>,
    /// Row count contributed by each included cycle
    pub cycle_rows: Vec<(Cycle, usize)>,
    /// Configured cycles that were skipped because `DEMO` was absent
    pub skipped_cycles: Vec<Cycle>,
}

impl PooledTable {
    /// Number of pooled rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of included cycles
    #[must_use]
    pub fn n_cycles(&self) -> usize {
        self.cycles.len()
    }

    /// Raw fields for which no candidate column exists in any cycle
    #[must_use]
    pub fn unavailable_fields(&self) -> Vec<RawField> {
        let columns = column_names(&self.batch);
        RawField::ALL
            .into_iter()
            .filter(|field| {
                !field
                    .column_candidates()
                    .iter()
                    .any(|candidate| columns.iter().any(|c| c == candidate))
            })
            .collect()
    }
}

/// Merges the domain tables of each cycle and pools the cycles
#[derive(Debug, Clone)]
pub struct CycleMerger {
    loader: TableLoader,
    cycles: Vec<Cycle>,
    domains: Vec<Domain>,
}

impl CycleMerger {
    /// Create a merger over the given cycles and domains
    ///
    /// `DEMO` is always loaded first whether or not it is listed.
    #[must_use]
    pub fn new(loader: TableLoader, cycles: Vec<Cycle>, domains: Vec<Domain>) -> Self {
        let domains = domains
            .into_iter()
            .filter(|domain| *domain != Domain::Demo)
            .collect();
        Self {
            loader,
            cycles,
            domains,
        }
    }

    /// Merge every configured domain for one cycle
    ///
    /// # Returns
    /// * `Ok(Some(batch))` - One row per `DEMO` row with a `CYCLE` column
    /// * `Ok(None)` - `DEMO` is absent, so the cycle is skipped
    pub fn merge_cycle(&self, cycle: &Cycle) -> Result<Option<RecordBatch>> {
        let Some(demo) = self.loader.load(Domain::Demo, cycle)? else {
            log_recovery(
                &Domain::Demo.table_name(cycle),
                &format!("mandatory table missing, skipping cycle {cycle}"),
            );
            return Ok(None);
        };

        let mut merged = demo.batch;
        for &domain in &self.domains {
            match self.loader.load(domain, cycle)? {
                Some(table) => {
                    merged = left_join(&merged, &table.batch, &table.name())?;
                }
                None => {
                    log_recovery(
                        &domain.table_name(cycle),
                        "table unavailable, its fields are null for this cycle",
                    );
                }
            }
        }

        Ok(Some(with_cycle_column(&merged, cycle)?))
    }

    /// Merge all configured cycles and concatenate them
    ///
    /// Cycles are merged in parallel; the pooled row order follows the
    /// configured cycle order.
    pub fn pool(&self) -> Result<PooledTable> {
        let start = Instant::now();
        log_operation_start("Pooling", &format!("{} cycles", self.cycles.len()));

        let merged = self
            .cycles
            .par_iter()
            .map(|cycle| {
                self.merge_cycle(cycle)
                    .map(|batch| (cycle.clone(), batch))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut included = Vec::new();
        let mut cycle_rows = Vec::new();
        let mut skipped_cycles = Vec::new();
        let mut batches = Vec::new();
        for (cycle, batch) in merged {
            match batch {
                Some(batch) => {
                    info!("Cycle {cycle}: {} rows merged", batch.num_rows());
                    cycle_rows.push((cycle.clone(), batch.num_rows()));
                    included.push(cycle);
                    batches.push(batch);
                }
                None => skipped_cycles.push(cycle),
            }
        }

        if batches.is_empty() {
            return Err(PipelineError::NoCyclesLoaded {
                data_dir: self.loader.config().data_dir.clone(),
            });
        }

        let batch = unify_and_concat(&batches)?;
        log_operation_complete(
            "pooled",
            &format!("{} cycles", included.len()),
            batch.num_rows(),
            Some(start.elapsed()),
        );

        Ok(PooledTable {
            batch,
            cycles: included,
            cycle_rows,
            skipped_cycles,
        })
    }
}

/// Left join `right` onto `left` by `SEQN`
///
/// Every left row appears exactly once in the result. The first right row
/// per subject id wins; unmatched left rows get nulls. Right columns whose
/// name already exists on the left are not joined again.
pub fn left_join(left: &RecordBatch, right: &RecordBatch, label: &str) -> Result<RecordBatch> {
    let left_keys = int_keys(left, SUBJECT_ID_COLUMN)?;
    let right_keys = int_keys(right, SUBJECT_ID_COLUMN)?;

    let mut index: FxHashMap<i64, u32> = FxHashMap::default();
    let mut duplicates = 0usize;
    for (row, key) in right_keys.iter().enumerate() {
        let Some(key) = key else { continue };
        let row = u32::try_from(row).map_err(|_| {
            PipelineError::schema(label, "table has more rows than can be indexed")
        })?;
        match index.entry(*key) {
            Entry::Occupied(_) => duplicates += 1,
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }
    if duplicates > 0 {
        warn!("{label}: {duplicates} duplicate {SUBJECT_ID_COLUMN} rows ignored, first occurrence kept");
    }

    let indices: UInt32Array = left_keys
        .iter()
        .map(|key| key.and_then(|k| index.get(&k).copied()))
        .collect();
    debug!(
        "{label}: {} of {} rows matched",
        indices.len() - indices.null_count(),
        indices.len()
    );

    let left_schema = left.schema();
    let mut fields: Vec<FieldRef> = left_schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = left.columns().to_vec();

    let right_schema = right.schema();
    for (field, column) in right_schema.fields().iter().zip(right.columns()) {
        if field.name() == SUBJECT_ID_COLUMN {
            continue;
        }
        if left_schema.index_of(field.name()).is_ok() {
            debug!("{label}: column {} already merged, skipped", field.name());
            continue;
        }
        columns.push(take(column.as_ref(), &indices, None)?);
        fields.push(Arc::new(Field::new(
            field.name(),
            field.data_type().clone(),
            true,
        )));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn with_cycle_column(batch: &RecordBatch, cycle: &Cycle) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    fields.push(Arc::new(Field::new(CYCLE_COLUMN, DataType::Utf8, false)));
    columns.push(Arc::new(StringArray::from(vec![
        cycle.as_str();
        batch.num_rows()
    ])));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Widest type two per-cycle column types can both be cast to
fn widen(current: &DataType, other: &DataType) -> DataType {
    if current == other {
        current.clone()
    } else if current.is_integer() && other.is_integer() {
        DataType::Int64
    } else if current.is_numeric() && other.is_numeric() {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

/// Bring per-cycle batches to one schema and concatenate them
///
/// The pooled schema is the union of all columns in first-seen order. A
/// column absent from a cycle is null for that cycle's rows.
pub fn unify_and_concat(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let mut order: Vec<String> = Vec::new();
    let mut types: FxHashMap<String, DataType> = FxHashMap::default();

    for batch in batches {
        for field in batch.schema().fields() {
            let name = field.name();
            if !order.contains(name) {
                order.push(name.clone());
            }
            if *field.data_type() == DataType::Null {
                continue;
            }
            let widened = match types.get(name) {
                Some(current) => widen(current, field.data_type()),
                None => field.data_type().clone(),
            };
            types.insert(name.clone(), widened);
        }
    }

    let fields: Vec<Field> = order
        .iter()
        .map(|name| {
            let data_type = types.get(name).cloned().unwrap_or(DataType::Utf8);
            Field::new(name, data_type, true)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(batches.len());
    for batch in batches {
        let columns = schema
            .fields()
            .iter()
            .map(|field| -> Result<ArrayRef> {
                match batch.column_by_name(field.name()) {
                    Some(column) if column.data_type() == field.data_type() => Ok(column.clone()),
                    Some(column) => Ok(cast(column, field.data_type())?),
                    None => Ok(new_null_array(field.data_type(), batch.num_rows())),
                }
            })
            .collect::<Result<Vec<ArrayRef>>>()?;
        aligned.push(RecordBatch::try_new(schema.clone(), columns)?);
    }

    Ok(concat_batches(&schema, &aligned)?)
}
