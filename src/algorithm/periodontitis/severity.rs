//! Periodontitis severity levels
//!
//! Staging follows the CDC/AAP surveillance case definitions. The absence of
//! exam data is not a level: callers hold an `Option<PerioStatus>` and `None`
//! there means "not classifiable", distinct from [`PerioStatus::None`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered periodontitis severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerioStatus {
    /// Examined, no periodontitis
    None = 0,
    /// Mild periodontitis
    Mild = 1,
    /// Moderate periodontitis
    Moderate = 2,
    /// Severe periodontitis
    Severe = 3,
}

impl PerioStatus {
    /// Labels of all levels
    pub const LABELS: &'static [&'static str] = &["None", "Mild", "Moderate", "Severe"];

    /// Get a descriptive name for this level
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }

    /// Moderate and severe periodontitis count as cases
    #[must_use]
    pub const fn is_case(self) -> bool {
        matches!(self, Self::Moderate | Self::Severe)
    }
}

impl fmt::Display for PerioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Binary case indicator; an unclassifiable record stays undefined
#[must_use]
pub fn periodontal_case(status: Option<PerioStatus>) -> Option<bool> {
    status.map(PerioStatus::is_case)
}
