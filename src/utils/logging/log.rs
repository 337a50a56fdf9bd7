//! Logging utilities
//!
//! Standardized messages for pipeline stages, so runs can be audited from the
//! log alone.

use std::time::Duration;

/// Log an operation start with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `subject` - What the operation works on (a cycle, a table, a study)
pub fn log_operation_start(operation: &str, subject: &str) {
    log::info!("{operation} {subject}");
}

/// Log an operation completion with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `subject` - What the operation worked on
/// * `items` - Number of rows or items produced
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(
    operation: &str,
    subject: &str,
    items: usize,
    elapsed: Option<Duration>,
) {
    if let Some(duration) = elapsed {
        log::info!("Successfully {operation} {subject}: {items} items in {duration:?}");
    } else {
        log::info!("Successfully {operation} {subject}: {items} items");
    }
}

/// Log a recovered problem together with the context needed to audit it
///
/// # Arguments
/// * `context` - Where it happened, e.g. `HSQ_F` or `Model 3`
/// * `message` - What was recovered and how
pub fn log_recovery(context: &str, message: &str) {
    log::warn!("[{context}] {message}");
}
