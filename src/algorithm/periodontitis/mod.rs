//! Periodontitis staging from the periodontal exam
//!
//! Implements the CDC/AAP case definitions over interproximal sites of the
//! 28 non-third-molar teeth:
//!
//! * Severe: at least 2 teeth with attachment loss >= 6 mm, and at least one
//!   site with pocket depth >= 5 mm.
//! * Moderate: at least 2 teeth with attachment loss >= 4 mm, or at least 2
//!   teeth with pocket depth >= 5 mm.
//! * Mild: at least 2 *sites* with attachment loss >= 3 mm, and either at
//!   least 2 teeth with pocket depth >= 4 mm or one site with pocket depth
//!   >= 5 mm.
//!
//! Rules are evaluated most severe first. "Teeth" means distinct teeth: two
//! qualifying sites on the same tooth count once.
//!
//! The Mild attachment-loss condition counts raw sites, so two qualifying
//! sites on a single tooth satisfy it. This is asymmetric with the Moderate
//! and Severe rules, which count distinct teeth. The asymmetry is kept as is;
//! results are only comparable with prior analyses under this reading.

pub mod severity;

use smallvec::SmallVec;

use crate::models::record::PerioExam;
use crate::schema::InterproximalSite;

pub use severity::{PerioStatus, periodontal_case};

type SiteSet = SmallVec<[(u8, InterproximalSite); 8]>;

/// Qualifying (tooth, site) pairs per staging threshold
#[derive(Debug, Default, Clone)]
pub struct SiteThresholds {
    /// Sites with attachment loss >= 6 mm
    pub attachment_ge6: SiteSet,
    /// Sites with attachment loss >= 4 mm
    pub attachment_ge4: SiteSet,
    /// Sites with attachment loss >= 3 mm
    pub attachment_ge3: SiteSet,
    /// Sites with pocket depth >= 5 mm
    pub pocket_ge5: SiteSet,
    /// Sites with pocket depth >= 4 mm
    pub pocket_ge4: SiteSet,
    /// Number of sites with at least one valid measurement
    pub measured_sites: usize,
}

impl SiteThresholds {
    /// Collect qualifying sites from an exam
    #[must_use]
    pub fn collect(exam: &PerioExam) -> Self {
        let mut sets = Self::default();

        for (tooth, site, attachment, pocket) in exam.measurements() {
            if attachment.is_some() || pocket.is_some() {
                sets.measured_sites += 1;
            }

            if let Some(al) = attachment {
                if al >= 6.0 {
                    sets.attachment_ge6.push((tooth, site));
                }
                if al >= 4.0 {
                    sets.attachment_ge4.push((tooth, site));
                }
                if al >= 3.0 {
                    sets.attachment_ge3.push((tooth, site));
                }
            }

            if let Some(pd) = pocket {
                if pd >= 5.0 {
                    sets.pocket_ge5.push((tooth, site));
                }
                if pd >= 4.0 {
                    sets.pocket_ge4.push((tooth, site));
                }
            }
        }

        sets
    }
}

/// Number of distinct teeth among a set of sites
#[must_use]
pub fn distinct_teeth(sites: &[(u8, InterproximalSite)]) -> usize {
    let mut teeth: SmallVec<[u8; 8]> = sites.iter().map(|(tooth, _)| *tooth).collect();
    teeth.sort_unstable();
    teeth.dedup();
    teeth.len()
}

/// Stage periodontitis from the qualifying site sets
#[must_use]
pub fn stage(sets: &SiteThresholds) -> PerioStatus {
    let severe = distinct_teeth(&sets.attachment_ge6) >= 2 && !sets.pocket_ge5.is_empty();
    if severe {
        return PerioStatus::Severe;
    }

    let moderate =
        distinct_teeth(&sets.attachment_ge4) >= 2 || distinct_teeth(&sets.pocket_ge5) >= 2;
    if moderate {
        return PerioStatus::Moderate;
    }

    // Raw site count for attachment loss, see the module documentation
    let mild = sets.attachment_ge3.len() >= 2
        && (distinct_teeth(&sets.pocket_ge4) >= 2 || !sets.pocket_ge5.is_empty());
    if mild {
        return PerioStatus::Mild;
    }

    PerioStatus::None
}

/// Classify an exam, or `None` when it holds no valid measurement at all
#[must_use]
pub fn classify_periodontitis(exam: &PerioExam) -> Option<PerioStatus> {
    let sets = SiteThresholds::collect(exam);
    if sets.measured_sites == 0 {
        return None;
    }
    Some(stage(&sets))
}
