//! Periodontal exam column layout
//!
//! The exam records attachment loss and pocket depth at up to six sites per
//! tooth. Staging only reads the four interproximal sites of the 28 teeth
//! that remain once third molars are excluded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Teeth that contribute to staging (third molars 1, 16, 17 and 32 excluded)
pub const TEETH: [u8; 28] = [
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28,
    29, 30, 31,
];

/// Position of a tooth in [`TEETH`]
#[must_use]
pub fn tooth_index(tooth: u8) -> Option<usize> {
    TEETH.iter().position(|&t| t == tooth)
}

/// The four interproximal measurement positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterproximalSite {
    /// Distal-facial (`D`)
    DistalFacial,
    /// Mesial-facial (`S`)
    MesialFacial,
    /// Distal-lingual (`P`)
    DistalLingual,
    /// Mesial-lingual (`A`)
    MesialLingual,
}

impl InterproximalSite {
    /// All sites in column order
    pub const ALL: [Self; 4] = [
        Self::DistalFacial,
        Self::MesialFacial,
        Self::DistalLingual,
        Self::MesialLingual,
    ];

    /// Column suffix of the site
    #[must_use]
    pub const fn suffix(self) -> char {
        match self {
            Self::DistalFacial => 'D',
            Self::MesialFacial => 'S',
            Self::DistalLingual => 'P',
            Self::MesialLingual => 'A',
        }
    }

    /// Position of the site in [`InterproximalSite::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for InterproximalSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Measurement type recorded at a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerioMeasure {
    /// Clinical attachment loss, mm (`LA` columns)
    AttachmentLoss,
    /// Probing pocket depth, mm (`PC` columns)
    PocketDepth,
}

impl PerioMeasure {
    /// Both measures
    pub const ALL: [Self; 2] = [Self::AttachmentLoss, Self::PocketDepth];

    /// Column code of the measure
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AttachmentLoss => "LA",
            Self::PocketDepth => "PC",
        }
    }

    /// Source column for a tooth and site, e.g. `OHX02LAD`
    #[must_use]
    pub fn column(self, tooth: u8, site: InterproximalSite) -> String {
        format!("OHX{tooth:02}{}{}", self.code(), site.suffix())
    }
}

/// Every exam column read for staging, with its grid coordinates
pub fn exam_columns() -> impl Iterator<Item = (PerioMeasure, usize, InterproximalSite, String)> {
    PerioMeasure::ALL.into_iter().flat_map(|measure| {
        TEETH.iter().enumerate().flat_map(move |(tooth_idx, &tooth)| {
            InterproximalSite::ALL
                .into_iter()
                .map(move |site| (measure, tooth_idx, site, measure.column(tooth, site)))
        })
    })
}
