//! Subject records
//!
//! A [`RawRecord`] holds the typed raw fields of one participant in one cycle.
//! A [`SubjectRecord`] pairs it with the fields derived from it. Records are
//! keyed by `(subject_id, cycle)`: the survey reuses its id space across
//! cycles, so the id alone is never unique in a pooled table.

use serde::{Deserialize, Serialize};

use crate::algorithm::periodontitis::PerioStatus;
use crate::models::types::{
    ActivityLevel, AgeGroup, BmiCategory, ChronicCategory, Education, EducationTier, Flossing,
    GeneralHealth, MaritalStatus, PhysicalActivity, RaceEthnicity, Sex, SmokingStatus,
};
use crate::schema::perio::tooth_index;
use crate::schema::{Cycle, InterproximalSite, PerioMeasure, RawField, TEETH};

type SiteGrid = [[Option<f64>; 4]; 28];

/// Periodontal exam values per tooth and interproximal site
///
/// Values are millimeters. Negative and non-finite values are stored as
/// missing. Teeth outside [`TEETH`] cannot be stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerioExam {
    attachment_loss: SiteGrid,
    pocket_depth: SiteGrid,
}

impl PerioExam {
    fn grid_mut(&mut self, measure: PerioMeasure) -> &mut SiteGrid {
        match measure {
            PerioMeasure::AttachmentLoss => &mut self.attachment_loss,
            PerioMeasure::PocketDepth => &mut self.pocket_depth,
        }
    }

    fn grid(&self, measure: PerioMeasure) -> &SiteGrid {
        match measure {
            PerioMeasure::AttachmentLoss => &self.attachment_loss,
            PerioMeasure::PocketDepth => &self.pocket_depth,
        }
    }

    /// Store a value by tooth number; returns `false` for excluded teeth
    pub fn set(
        &mut self,
        measure: PerioMeasure,
        tooth: u8,
        site: InterproximalSite,
        value: Option<f64>,
    ) -> bool {
        match tooth_index(tooth) {
            Some(idx) => {
                self.set_at(measure, idx, site, value);
                true
            }
            None => false,
        }
    }

    /// Store a value by position in [`TEETH`]
    pub fn set_at(
        &mut self,
        measure: PerioMeasure,
        tooth_idx: usize,
        site: InterproximalSite,
        value: Option<f64>,
    ) {
        let value = value.filter(|v| v.is_finite() && *v >= 0.0);
        if let Some(row) = self.grid_mut(measure).get_mut(tooth_idx) {
            row[site.index()] = value;
        }
    }

    /// Builder-style [`PerioExam::set`]
    #[must_use]
    pub fn with(mut self, measure: PerioMeasure, tooth: u8, site: InterproximalSite, value: f64) -> Self {
        self.set(measure, tooth, site, Some(value));
        self
    }

    /// Value at a tooth and site
    #[must_use]
    pub fn get(&self, measure: PerioMeasure, tooth: u8, site: InterproximalSite) -> Option<f64> {
        tooth_index(tooth).and_then(|idx| self.grid(measure)[idx][site.index()])
    }

    /// Every (tooth, site, attachment loss, pocket depth) in tooth order
    pub fn measurements(
        &self,
    ) -> impl Iterator<Item = (u8, InterproximalSite, Option<f64>, Option<f64>)> + '_ {
        TEETH.iter().enumerate().flat_map(move |(idx, &tooth)| {
            InterproximalSite::ALL.into_iter().map(move |site| {
                (
                    tooth,
                    site,
                    self.attachment_loss[idx][site.index()],
                    self.pocket_depth[idx][site.index()],
                )
            })
        })
    }

    /// Whether any site holds a valid measurement
    #[must_use]
    pub fn has_measurements(&self) -> bool {
        self.measurements()
            .any(|(_, _, al, pd)| al.is_some() || pd.is_some())
    }
}

/// Typed raw fields of one participant in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Survey subject identifier (`SEQN`)
    pub subject_id: i64,
    /// Cycle the row was loaded from
    pub cycle: Cycle,
    values: [Option<f64>; RawField::COUNT],
    /// Periodontal exam grid
    pub perio: PerioExam,
}

impl RawRecord {
    /// Create a record with every field missing
    #[must_use]
    pub fn new(subject_id: i64, cycle: Cycle) -> Self {
        Self {
            subject_id,
            cycle,
            values: [None; RawField::COUNT],
            perio: PerioExam::default(),
        }
    }

    /// Raw value of a field
    #[must_use]
    pub fn get(&self, field: RawField) -> Option<f64> {
        self.values[field.index()]
    }

    /// Raw value as an integer survey code; fractional values are not codes
    #[must_use]
    pub fn code(&self, field: RawField) -> Option<i64> {
        self.get(field)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    }

    /// Set a field; non-finite values are stored as missing
    pub fn set(&mut self, field: RawField, value: Option<f64>) {
        self.values[field.index()] = value.filter(|v| v.is_finite());
    }

    /// Builder-style [`RawRecord::set`]
    #[must_use]
    pub fn with(mut self, field: RawField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Builder-style replacement of the exam grid
    #[must_use]
    pub fn with_perio(mut self, perio: PerioExam) -> Self {
        self.perio = perio;
        self
    }
}

/// Fields computed from a [`RawRecord`]; written only by the deriver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    /// Periodontitis stage, `None` when the exam holds no data
    pub perio_status: Option<PerioStatus>,
    /// Moderate or severe periodontitis
    pub perio_case: Option<bool>,
    /// Sex
    pub sex: Option<Sex>,
    /// Age in years
    pub age: Option<f64>,
    /// Older-adult age group
    pub age_group: Option<AgeGroup>,
    /// Race/ethnicity
    pub race: Option<RaceEthnicity>,
    /// Four-level education
    pub education: Option<Education>,
    /// Three-tier education
    pub education_tier: Option<EducationTier>,
    /// Marital status
    pub marital_status: Option<MaritalStatus>,
    /// Income to poverty ratio, capped
    pub poverty_ratio: Option<f64>,
    /// Covered by health insurance
    pub has_insurance: Option<bool>,
    /// Smoking status
    pub smoking: Option<SmokingStatus>,
    /// Drinks per day
    pub alcohol: Option<f64>,
    /// Work-related activity
    pub physical_activity: Option<PhysicalActivity>,
    /// Work and recreational activity level
    pub activity_level: Option<ActivityLevel>,
    /// Flossing frequency
    pub flossing: Option<Flossing>,
    /// Body mass index
    pub bmi: Option<f64>,
    /// BMI category
    pub bmi_category: Option<BmiCategory>,
    /// Diagnosed diabetes
    pub diabetes: Option<bool>,
    /// Diagnosed hypertension
    pub hypertension: Option<bool>,
    /// Diagnosed high cholesterol
    pub high_cholesterol: Option<bool>,
    /// Cardiovascular disease from chest pain questions
    pub cvd: Option<bool>,
    /// Number of chronic conditions over the observed indicators
    pub chronic_count: Option<u8>,
    /// Chronic condition category
    pub chronic_category: Option<ChronicCategory>,
    /// Days of poor physical health in the past 30
    pub physical_health_days: Option<f64>,
    /// Days of poor mental health in the past 30
    pub mental_health_days: Option<f64>,
    /// Days with activity limitation in the past 30
    pub activity_limitation_days: Option<f64>,
    /// Self-rated general health
    pub general_health: Option<GeneralHealth>,
    /// Pooled survey weight
    pub weight: Option<f64>,
}

/// One participant in one cycle with raw and derived fields
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    /// Raw fields as loaded
    pub raw: RawRecord,
    /// Derived fields
    pub derived: DerivedFields,
}

impl SubjectRecord {
    /// Survey subject identifier
    #[must_use]
    pub fn subject_id(&self) -> i64 {
        self.raw.subject_id
    }

    /// Cycle of the record
    #[must_use]
    pub fn cycle(&self) -> &Cycle {
        &self.raw.cycle
    }

    /// Pooled survey weight
    #[must_use]
    pub fn weight(&self) -> Option<f64> {
        self.derived.weight
    }
}
