//! Shared utilities
//!
//! Arrow column access, logging and progress helpers, and the fixtures used
//! by the unit and integration tests.

pub mod arrow;
pub mod logging;
pub mod test;
