//! Utilities for working with Arrow arrays.
//!
//! Raw survey columns arrive with whatever type CSV inference picked. These
//! helpers fetch a column by name and bring it to the type the pipeline needs,
//! with unparsable values turned into nulls.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{PipelineError, Result};

/// Get a column from a record batch converted to the expected type
///
/// # Arguments
/// * `batch` - The record batch containing the column
/// * `column_name` - The name of the column to extract
/// * `expected_type` - The data type the caller needs
/// * `required` - Whether a missing column is an error
///
/// # Returns
/// * `Ok(Some(ArrayRef))` - The column, cast if necessary
/// * `Ok(None)` - The column is absent and not required
pub fn get_column(
    batch: &RecordBatch,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let Ok(idx) = batch.schema().index_of(column_name) else {
        if required {
            return Err(PipelineError::schema(
                "batch",
                format!("required column {column_name} not found"),
            ));
        }
        return Ok(None);
    };

    let column = batch.column(idx);
    if column.data_type() == expected_type {
        return Ok(Some(column.clone()));
    }

    debug!(
        "Casting column '{column_name}' from {:?} to {expected_type:?}",
        column.data_type()
    );
    // Safe casts turn values that fail to parse into nulls
    Ok(Some(cast(column, expected_type)?))
}

/// Read a column as `Option<f64>` values; non-finite values become `None`
pub fn float_column(batch: &RecordBatch, column_name: &str) -> Result<Option<Vec<Option<f64>>>> {
    let Some(array) = get_column(batch, column_name, &DataType::Float64, false)? else {
        return Ok(None);
    };
    let values = array.as_primitive::<Float64Type>();
    Ok(Some(
        values
            .iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect(),
    ))
}

/// Read a join key column as `Option<i64>` values
pub fn int_keys(batch: &RecordBatch, column_name: &str) -> Result<Vec<Option<i64>>> {
    let array = get_column(batch, column_name, &DataType::Int64, true)?
        .ok_or_else(|| PipelineError::schema("batch", format!("missing {column_name}")))?;
    Ok(array.as_primitive::<Int64Type>().iter().collect())
}

/// Column names of a batch in schema order
#[must_use]
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect()
}
