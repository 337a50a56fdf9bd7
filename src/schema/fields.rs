//! Raw survey columns read by the pipeline

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Domain;

/// A known raw survey column
///
/// All raw fields are numeric codes or measurements. A field may declare a
/// fallback column used when the primary column is absent from a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawField {
    /// Age in years at screening (`RIDAGEYR`)
    Age,
    /// Sex, 1 = male, 2 = female (`RIAGENDR`)
    Sex,
    /// Race/Hispanic origin (`RIDRETH1`)
    RaceEthnicity,
    /// Education level, adults 20+ (`DMDEDUC2`)
    Education,
    /// Marital status (`DMDMARTL`)
    MaritalStatus,
    /// Family income to poverty ratio (`INDFMPIR`)
    PovertyRatio,
    /// Two-year MEC exam weight (`WTMEC2YR`)
    ExamWeight,
    /// Masked variance pseudo-stratum (`SDMVSTRA`)
    Stratum,
    /// Masked variance pseudo-PSU (`SDMVPSU`)
    Psu,
    /// Dietary recall status (`DR1DRSTZ`)
    DietRecallStatus,
    /// Energy, kcal (`DR1TKCAL`)
    Energy,
    /// Total sugars, g (`DR1TSUGR`)
    Sugar,
    /// Dietary fiber, g (`DR1TFIBE`)
    Fiber,
    /// Vitamin C, mg (`DR1TVC`)
    VitaminC,
    /// Calcium, mg (`DR1TCALC`)
    Calcium,
    /// Periodontal exam status (`OHDDESTS`, falling back to `OHDEXSTS`)
    PerioExamStatus,
    /// Body mass index (`BMXBMI`)
    Bmi,
    /// Waist circumference, cm (`BMXWAIST`)
    WaistCircumference,
    /// Smoked at least 100 cigarettes in life (`SMQ020`)
    SmokedLifetime,
    /// Do you now smoke cigarettes (`SMQ040`)
    SmokingNow,
    /// Doctor told you have diabetes (`DIQ010`)
    DiabetesDiagnosis,
    /// Had at least 12 alcohol drinks in lifetime (`ALQ101`)
    EverDrinker,
    /// Average drinks per day in the past 12 months (`ALQ130`)
    DrinksPerDay,
    /// Vigorous work activity (`PAQ605`)
    VigorousWork,
    /// Moderate work activity (`PAQ620`)
    ModerateWork,
    /// Vigorous recreational activity (`PAQ650`)
    VigorousRecreation,
    /// Moderate recreational activity (`PAQ665`)
    ModerateRecreation,
    /// Days per week using dental floss (`OHQ870`)
    FlossingDays,
    /// General health condition (`HSD010`)
    GeneralHealth,
    /// Number of days physical health was not good (`HSQ470`)
    PhysicalUnhealthyDays,
    /// Number of days mental health was not good (`HSQ480`)
    MentalUnhealthyDays,
    /// Inactive days due to physical or mental health (`HSQ490`)
    ActivityLimitedDays,
    /// Ever told you had high blood pressure (`BPQ020`)
    Hypertension,
    /// Ever told blood cholesterol level is high (`BPQ080`)
    HighCholesterol,
    /// Any pain or discomfort in chest (`CDQ001`)
    ChestPain,
    /// Severe chest pain lasting more than half an hour (`CDQ009`)
    SevereChestPain,
    /// Covered by health insurance (`HIQ011`)
    Insurance,
}

impl RawField {
    /// Number of declared raw fields
    pub const COUNT: usize = 37;

    /// Every declared raw field
    pub const ALL: [Self; Self::COUNT] = [
        Self::Age,
        Self::Sex,
        Self::RaceEthnicity,
        Self::Education,
        Self::MaritalStatus,
        Self::PovertyRatio,
        Self::ExamWeight,
        Self::Stratum,
        Self::Psu,
        Self::DietRecallStatus,
        Self::Energy,
        Self::Sugar,
        Self::Fiber,
        Self::VitaminC,
        Self::Calcium,
        Self::PerioExamStatus,
        Self::Bmi,
        Self::WaistCircumference,
        Self::SmokedLifetime,
        Self::SmokingNow,
        Self::DiabetesDiagnosis,
        Self::EverDrinker,
        Self::DrinksPerDay,
        Self::VigorousWork,
        Self::ModerateWork,
        Self::VigorousRecreation,
        Self::ModerateRecreation,
        Self::FlossingDays,
        Self::GeneralHealth,
        Self::PhysicalUnhealthyDays,
        Self::MentalUnhealthyDays,
        Self::ActivityLimitedDays,
        Self::Hypertension,
        Self::HighCholesterol,
        Self::ChestPain,
        Self::SevereChestPain,
        Self::Insurance,
    ];

    /// Primary source column
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Age => "RIDAGEYR",
            Self::Sex => "RIAGENDR",
            Self::RaceEthnicity => "RIDRETH1",
            Self::Education => "DMDEDUC2",
            Self::MaritalStatus => "DMDMARTL",
            Self::PovertyRatio => "INDFMPIR",
            Self::ExamWeight => "WTMEC2YR",
            Self::Stratum => "SDMVSTRA",
            Self::Psu => "SDMVPSU",
            Self::DietRecallStatus => "DR1DRSTZ",
            Self::Energy => "DR1TKCAL",
            Self::Sugar => "DR1TSUGR",
            Self::Fiber => "DR1TFIBE",
            Self::VitaminC => "DR1TVC",
            Self::Calcium => "DR1TCALC",
            Self::PerioExamStatus => "OHDDESTS",
            Self::Bmi => "BMXBMI",
            Self::WaistCircumference => "BMXWAIST",
            Self::SmokedLifetime => "SMQ020",
            Self::SmokingNow => "SMQ040",
            Self::DiabetesDiagnosis => "DIQ010",
            Self::EverDrinker => "ALQ101",
            Self::DrinksPerDay => "ALQ130",
            Self::VigorousWork => "PAQ605",
            Self::ModerateWork => "PAQ620",
            Self::VigorousRecreation => "PAQ650",
            Self::ModerateRecreation => "PAQ665",
            Self::FlossingDays => "OHQ870",
            Self::GeneralHealth => "HSD010",
            Self::PhysicalUnhealthyDays => "HSQ470",
            Self::MentalUnhealthyDays => "HSQ480",
            Self::ActivityLimitedDays => "HSQ490",
            Self::Hypertension => "BPQ020",
            Self::HighCholesterol => "BPQ080",
            Self::ChestPain => "CDQ001",
            Self::SevereChestPain => "CDQ009",
            Self::Insurance => "HIQ011",
        }
    }

    /// Column tried when the primary column is absent
    #[must_use]
    pub const fn fallback_column(self) -> Option<&'static str> {
        match self {
            Self::PerioExamStatus => Some("OHDEXSTS"),
            _ => None,
        }
    }

    /// Primary column followed by the fallback, in resolution order
    #[must_use]
    pub fn column_candidates(self) -> Vec<&'static str> {
        std::iter::once(self.column())
            .chain(self.fallback_column())
            .collect()
    }

    /// Domain table the field is read from
    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Age
            | Self::Sex
            | Self::RaceEthnicity
            | Self::Education
            | Self::MaritalStatus
            | Self::PovertyRatio
            | Self::ExamWeight
            | Self::Stratum
            | Self::Psu => Domain::Demo,
            Self::DietRecallStatus
            | Self::Energy
            | Self::Sugar
            | Self::Fiber
            | Self::VitaminC
            | Self::Calcium => Domain::Dr1Tot,
            Self::PerioExamStatus => Domain::Ohxper,
            Self::Bmi | Self::WaistCircumference => Domain::Bmx,
            Self::SmokedLifetime | Self::SmokingNow => Domain::Smq,
            Self::DiabetesDiagnosis => Domain::Diq,
            Self::EverDrinker | Self::DrinksPerDay => Domain::Alq,
            Self::VigorousWork
            | Self::ModerateWork
            | Self::VigorousRecreation
            | Self::ModerateRecreation => Domain::Paq,
            Self::FlossingDays => Domain::Ohq,
            Self::GeneralHealth
            | Self::PhysicalUnhealthyDays
            | Self::MentalUnhealthyDays
            | Self::ActivityLimitedDays => Domain::Hsq,
            Self::Hypertension | Self::HighCholesterol => Domain::Bpq,
            Self::ChestPain | Self::SevereChestPain => Domain::Cdq,
            Self::Insurance => Domain::Hiq,
        }
    }

    /// Position of the field in [`RawField::ALL`]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}
