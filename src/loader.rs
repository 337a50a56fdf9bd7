//! Per-cycle survey table loading
//!
//! Tables are delimited text files named `{DOMAIN}_{CYCLE}.{ext}`. A missing
//! or unreadable table is not an error: the loader warns and returns `None`
//! so the merger can carry on with the domains that did load.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use crate::config::LoaderConfig;
use crate::error::util::safe_read_bytes;
use crate::error::{PipelineError, Result};
use crate::schema::{Cycle, Domain, SUBJECT_ID_COLUMN};
use crate::utils::arrow::column_names;

/// One loaded domain table for one cycle
#[derive(Debug, Clone)]
pub struct DomainTable {
    /// Domain of the table
    pub domain: Domain,
    /// Cycle of the table
    pub cycle: Cycle,
    /// Table contents with upper-cased column names
    pub batch: RecordBatch,
}

impl DomainTable {
    /// Table label, e.g. `DEMO_F`
    #[must_use]
    pub fn name(&self) -> String {
        self.domain.table_name(&self.cycle)
    }

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Loads domain tables from a data directory
#[derive(Debug, Clone)]
pub struct TableLoader {
    config: LoaderConfig,
}

impl TableLoader {
    /// Create a loader with the given configuration
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Loader configuration
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resolve the file holding a domain table
    ///
    /// The exact `{DOMAIN}_{CYCLE}.{ext}` name is tried first, then a
    /// case-insensitive scan of the data directory for the same name.
    #[must_use]
    pub fn resolve_path(&self, domain: Domain, cycle: &Cycle) -> Option<PathBuf> {
        let file_name = format!("{}.{}", domain.table_name(cycle), self.config.extension);
        let exact = self.config.data_dir.join(&file_name);
        if exact.is_file() {
            return Some(exact);
        }

        let entries = fs::read_dir(&self.config.data_dir).ok()?;
        entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .find(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.eq_ignore_ascii_case(&file_name))
            })
    }

    /// Load one domain table for one cycle
    ///
    /// # Returns
    /// * `Ok(Some(table))` - The table loaded and carries the subject id column
    /// * `Ok(None)` - The file is missing or could not be parsed
    /// * `Err(PipelineError::Schema)` - The table lacks `SEQN`, or a declared
    ///   column under strict schema checking
    pub fn load(&self, domain: Domain, cycle: &Cycle) -> Result<Option<DomainTable>> {
        let table_name = domain.table_name(cycle);
        let Some(path) = self.resolve_path(domain, cycle) else {
            warn!(
                "Table {table_name} not found in {} (domain {domain}, cycle {})",
                self.config.data_dir.display(),
                cycle.as_str()
            );
            return Ok(None);
        };

        let batch = match read_delimited(&path, self.config.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(
                    "Could not read {table_name} from {}: {e}; continuing without it",
                    path.display()
                );
                return Ok(None);
            }
        };

        let columns = column_names(&batch);
        if !columns.iter().any(|c| c == SUBJECT_ID_COLUMN) {
            return Err(PipelineError::schema(
                &table_name,
                format!("subject id column {SUBJECT_ID_COLUMN} is missing"),
            ));
        }

        let missing = domain.missing_fields(&columns);
        if !missing.is_empty() {
            let listed = missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if self.config.strict_schema {
                return Err(PipelineError::schema(
                    &table_name,
                    format!("missing declared columns: {listed}"),
                ));
            }
            warn!("{table_name} lacks declared columns: {listed}");
        }

        debug!(
            "Loaded {table_name}: {} rows, {} columns",
            batch.num_rows(),
            batch.num_columns()
        );

        Ok(Some(DomainTable {
            domain,
            cycle: cycle.clone(),
            batch,
        }))
    }
}

/// Read a delimited file with a header row into a single batch
///
/// The schema is inferred from the whole file and column names are
/// upper-cased.
pub fn read_delimited(path: &Path, batch_size: usize) -> Result<RecordBatch> {
    let bytes = safe_read_bytes(path, "loading survey table")?;

    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(&bytes), None)?;
    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name().to_uppercase(), field.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(batch_size.max(1))
        .build(Cursor::new(&bytes))?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}
