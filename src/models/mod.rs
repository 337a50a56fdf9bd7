//! Domain models for the pooled survey cohort
//!
//! Typed records, semantic categories and the analysis variables read from
//! them.

pub mod extract;
pub mod record;
pub mod types;
pub mod variable;

pub use extract::extract_records;
pub use record::{DerivedFields, PerioExam, RawRecord, SubjectRecord};
pub use variable::{Value, Variable, VariableKind};
