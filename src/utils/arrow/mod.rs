//! Arrow data handling utilities

pub mod array_utils;

pub use array_utils::{column_names, float_column, get_column, int_keys};
