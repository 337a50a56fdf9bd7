//! Test utilities
//!
//! CSV fixtures for the loader and merger, and seeded synthetic cohorts for
//! the statistical stages.

pub mod synthetic;

// Re-export commonly used functions for convenience
pub use fixtures::{CsvTable, demo_table};
pub use synthetic::{diet_cohort, older_men_cohort};
