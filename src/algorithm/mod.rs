//! Algorithm implementations for the pooled cohort workflow
//!
//! This module contains the stages that turn loaded survey tables into an
//! analytic sample and estimates: cycle merging, variable derivation,
//! periodontitis staging, cohort exclusion, descriptive statistics and
//! regression.

pub mod cohort;
pub mod derive;
pub mod descriptive;
pub mod merge;
pub mod periodontitis;
pub mod regression;
