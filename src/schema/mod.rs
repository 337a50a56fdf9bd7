//! Typed schema of the survey tables
//!
//! Cycles, domains and the raw columns the pipeline reads are enumerated here.
//! Column names are resolved once against the pooled table instead of being
//! looked up by string throughout the pipeline.

pub mod fields;
pub mod perio;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fields::RawField;
pub use perio::{InterproximalSite, PerioMeasure, TEETH};

/// Subject identifier column, the join key of every domain table
pub const SUBJECT_ID_COLUMN: &str = "SEQN";

/// Provenance column appended by the cycle merger
pub const CYCLE_COLUMN: &str = "CYCLE";

/// A survey wave identifier such as `"F"` (2009-2010)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cycle(String);

impl Cycle {
    /// Create a cycle from its letter code; the code is upper-cased
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    /// The cycle letter code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar years covered by the cycle, when it is a known wave
    #[must_use]
    pub fn years(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "A" => Some("1999-2000"),
            "B" => Some("2001-2002"),
            "C" => Some("2003-2004"),
            "D" => Some("2005-2006"),
            "E" => Some("2007-2008"),
            "F" => Some("2009-2010"),
            "G" => Some("2011-2012"),
            "H" => Some("2013-2014"),
            "I" => Some("2015-2016"),
            "J" => Some("2017-2018"),
            _ => None,
        }
    }

    /// Build a list of cycles from letter codes
    pub fn list<I, S>(ids: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter().map(Self::new).collect()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.years() {
            Some(years) => write!(f, "{} ({years})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Survey table families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    /// Demographics, sampling design and exam weights (mandatory)
    #[serde(rename = "DEMO")]
    Demo,
    /// First-day dietary recall totals
    #[serde(rename = "DR1TOT")]
    Dr1Tot,
    /// Periodontal examination
    #[serde(rename = "OHXPER")]
    Ohxper,
    /// Body measures
    #[serde(rename = "BMX")]
    Bmx,
    /// Smoking questionnaire
    #[serde(rename = "SMQ")]
    Smq,
    /// Diabetes questionnaire
    #[serde(rename = "DIQ")]
    Diq,
    /// Alcohol use questionnaire
    #[serde(rename = "ALQ")]
    Alq,
    /// Physical activity questionnaire
    #[serde(rename = "PAQ")]
    Paq,
    /// Oral health questionnaire
    #[serde(rename = "OHQ")]
    Ohq,
    /// Current health status (healthy days)
    #[serde(rename = "HSQ")]
    Hsq,
    /// Blood pressure and cholesterol questionnaire
    #[serde(rename = "BPQ")]
    Bpq,
    /// Cardiovascular health questionnaire
    #[serde(rename = "CDQ")]
    Cdq,
    /// Health insurance questionnaire
    #[serde(rename = "HIQ")]
    Hiq,
}

impl Domain {
    /// Every known domain
    pub const ALL: [Self; 13] = [
        Self::Demo,
        Self::Dr1Tot,
        Self::Ohxper,
        Self::Bmx,
        Self::Smq,
        Self::Diq,
        Self::Alq,
        Self::Paq,
        Self::Ohq,
        Self::Hsq,
        Self::Bpq,
        Self::Cdq,
        Self::Hiq,
    ];

    /// File prefix of the domain, e.g. `DEMO`
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Demo => "DEMO",
            Self::Dr1Tot => "DR1TOT",
            Self::Ohxper => "OHXPER",
            Self::Bmx => "BMX",
            Self::Smq => "SMQ",
            Self::Diq => "DIQ",
            Self::Alq => "ALQ",
            Self::Paq => "PAQ",
            Self::Ohq => "OHQ",
            Self::Hsq => "HSQ",
            Self::Bpq => "BPQ",
            Self::Cdq => "CDQ",
            Self::Hiq => "HIQ",
        }
    }

    /// Look up a domain by its file prefix (case-insensitive)
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.prefix().eq_ignore_ascii_case(prefix))
    }

    /// Whether a cycle without this domain must be skipped
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Demo)
    }

    /// Table label for a cycle, e.g. `DEMO_F`
    #[must_use]
    pub fn table_name(self, cycle: &Cycle) -> String {
        format!("{}_{}", self.prefix(), cycle.as_str())
    }

    /// Raw fields this domain is expected to carry
    pub fn declared_fields(self) -> impl Iterator<Item = RawField> {
        RawField::ALL
            .into_iter()
            .filter(move |field| field.domain() == self)
    }

    /// Declared fields for which none of the candidate columns is present
    ///
    /// `columns` must already be upper-cased.
    pub fn missing_fields(self, columns: &[String]) -> Vec<RawField> {
        self.declared_fields()
            .filter(|field| {
                !field
                    .column_candidates()
                    .iter()
                    .any(|candidate| columns.iter().any(|c| c == candidate))
            })
            .collect()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}
