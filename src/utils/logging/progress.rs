//! Progress reporting for long-running operations
//!
//! Model grids can run for a while on the full pooled sample. The bars are
//! hidden unless the run asks for them, so library users and tests stay quiet.

use indicatif::{ProgressBar, ProgressStyle};

/// Default style for a model grid progress bar
pub const DEFAULT_MODEL_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";

/// Create a progress bar for fitting a sequence of models
///
/// # Arguments
/// * `length` - Number of models to fit
/// * `description` - Optional description to display as the initial message
/// * `visible` - Draw the bar; a hidden bar still counts positions
#[must_use]
pub fn create_model_progress_bar(length: u64, description: Option<&str>, visible: bool) -> ProgressBar {
    let pb = if visible {
        ProgressBar::new(length)
    } else {
        ProgressBar::hidden()
    };
    pb.set_length(length);

    let style = ProgressStyle::default_bar()
        .template(DEFAULT_MODEL_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);

    if let Some(desc) = description {
        pb.set_message(desc.to_string());
    }

    pb
}

/// Finish a progress bar with an optional completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
