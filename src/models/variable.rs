//! Analysis variables
//!
//! [`Variable`] names every column the cohort filter, the descriptive
//! aggregator and the regression runner can ask a [`SubjectRecord`] for.
//! Continuous and binary variables read as numbers, categorical variables as
//! their level label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithm::periodontitis::PerioStatus;
use crate::models::record::SubjectRecord;
use crate::models::types::{
    ActivityLevel, AgeGroup, BmiCategory, ChronicCategory, Education, EducationTier, Flossing,
    GeneralHealth, MaritalStatus, PhysicalActivity, RaceEthnicity, Sex, SmokingStatus,
};
use crate::schema::RawField;

/// Measurement scale of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// Real-valued
    Continuous,
    /// 0/1 indicator
    Binary,
    /// Unordered or ordered levels
    Categorical,
}

/// Value of a variable for one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Continuous or binary value
    Number(f64),
    /// Categorical level label
    Category(&'static str),
    /// Not available
    Missing,
}

impl Value {
    /// Numeric value, if any
    #[must_use]
    pub const fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Categorical label, if any
    #[must_use]
    pub const fn as_category(self) -> Option<&'static str> {
        match self {
            Self::Category(label) => Some(label),
            _ => None,
        }
    }

    /// Whether the value is missing
    #[must_use]
    pub const fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

const BINARY_LEVELS: &[&str] = &["No", "Yes"];

/// Named analysis variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    // Continuous
    /// Age in years
    Age,
    /// Income to poverty ratio (capped)
    PovertyRatio,
    /// Body mass index
    Bmi,
    /// Waist circumference
    WaistCircumference,
    /// Drinks per day
    Alcohol,
    /// Total energy intake
    Energy,
    /// Total sugars intake
    Sugar,
    /// Dietary fiber intake
    Fiber,
    /// Vitamin C intake
    VitaminC,
    /// Calcium intake
    Calcium,
    /// Poor physical health days
    PhysicalHealthDays,
    /// Poor mental health days
    MentalHealthDays,
    /// Activity limitation days
    ActivityLimitationDays,
    /// Number of chronic conditions
    ChronicCount,
    /// Pooled survey weight
    Weight,
    /// Variance pseudo-stratum
    Stratum,
    /// Variance pseudo-PSU
    Psu,
    // Binary
    /// Moderate or severe periodontitis
    PerioCase,
    /// Diagnosed diabetes
    Diabetes,
    /// Diagnosed hypertension
    Hypertension,
    /// Diagnosed high cholesterol
    HighCholesterol,
    /// Cardiovascular disease
    Cvd,
    /// Covered by health insurance
    HasInsurance,
    /// At least one chronic condition
    AnyChronic,
    /// Two or more chronic conditions
    Multimorbidity,
    // Categorical
    /// Periodontitis stage
    PerioStatus,
    /// Sex
    Sex,
    /// Race/ethnicity
    Race,
    /// Four-level education
    Education,
    /// Three-tier education
    EducationTier,
    /// Marital status
    MaritalStatus,
    /// Smoking status
    Smoking,
    /// BMI category
    BmiCategory,
    /// Flossing frequency
    Flossing,
    /// Work-related physical activity
    PhysicalActivity,
    /// Activity level
    ActivityLevel,
    /// Older-adult age group
    AgeGroup,
    /// Chronic condition category
    ChronicCategory,
    /// Self-rated general health
    GeneralHealth,
}

impl Variable {
    /// Column name used in output tables and design matrices
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::PovertyRatio => "poverty_ratio",
            Self::Bmi => "bmi",
            Self::WaistCircumference => "waist_circumference",
            Self::Alcohol => "alcohol",
            Self::Energy => "energy",
            Self::Sugar => "sugar",
            Self::Fiber => "fiber",
            Self::VitaminC => "vitamin_c",
            Self::Calcium => "calcium",
            Self::PhysicalHealthDays => "physical_health_days",
            Self::MentalHealthDays => "mental_health_days",
            Self::ActivityLimitationDays => "activity_limitation_days",
            Self::ChronicCount => "chronic_count",
            Self::Weight => "weight",
            Self::Stratum => "stratum",
            Self::Psu => "psu",
            Self::PerioCase => "perio_case",
            Self::Diabetes => "diabetes",
            Self::Hypertension => "hypertension",
            Self::HighCholesterol => "high_cholesterol",
            Self::Cvd => "cvd",
            Self::HasInsurance => "has_insurance",
            Self::AnyChronic => "any_chronic",
            Self::Multimorbidity => "multimorbidity",
            Self::PerioStatus => "perio_status",
            Self::Sex => "sex",
            Self::Race => "race",
            Self::Education => "education",
            Self::EducationTier => "education_tier",
            Self::MaritalStatus => "marital_status",
            Self::Smoking => "smoking",
            Self::BmiCategory => "bmi_category",
            Self::Flossing => "flossing",
            Self::PhysicalActivity => "physical_activity",
            Self::ActivityLevel => "activity_level",
            Self::AgeGroup => "age_group",
            Self::ChronicCategory => "chronic_category",
            Self::GeneralHealth => "general_health",
        }
    }

    /// Human-readable label for descriptive tables
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Age => "Age (years)",
            Self::PovertyRatio => "Poverty income ratio",
            Self::Bmi => "BMI (kg/m^2)",
            Self::WaistCircumference => "Waist circumference (cm)",
            Self::Alcohol => "Alcohol (drinks/day)",
            Self::Energy => "Total energy (kcal)",
            Self::Sugar => "Sugar (g)",
            Self::Fiber => "Fiber (g)",
            Self::VitaminC => "Vitamin C (mg)",
            Self::Calcium => "Calcium (mg)",
            Self::PhysicalHealthDays => "Physically unhealthy days",
            Self::MentalHealthDays => "Mentally unhealthy days",
            Self::ActivityLimitationDays => "Activity limitation days",
            Self::ChronicCount => "Chronic conditions (count)",
            Self::Weight => "Survey weight",
            Self::Stratum => "Stratum",
            Self::Psu => "PSU",
            Self::PerioCase => "Periodontitis (moderate/severe)",
            Self::Diabetes => "Diabetes",
            Self::Hypertension => "Hypertension",
            Self::HighCholesterol => "High cholesterol",
            Self::Cvd => "Cardiovascular disease",
            Self::HasInsurance => "Health insurance",
            Self::AnyChronic => "Any chronic condition",
            Self::Multimorbidity => "Multimorbidity (2+)",
            Self::PerioStatus => "Periodontitis stage",
            Self::Sex => "Sex",
            Self::Race => "Race/Ethnicity",
            Self::Education => "Education",
            Self::EducationTier => "Education",
            Self::MaritalStatus => "Marital status",
            Self::Smoking => "Smoking",
            Self::BmiCategory => "BMI category",
            Self::Flossing => "Flossing",
            Self::PhysicalActivity => "Physical activity",
            Self::ActivityLevel => "Activity level",
            Self::AgeGroup => "Age group",
            Self::ChronicCategory => "Chronic conditions",
            Self::GeneralHealth => "General health",
        }
    }

    /// Measurement scale
    #[must_use]
    pub const fn kind(self) -> VariableKind {
        match self {
            Self::Age
            | Self::PovertyRatio
            | Self::Bmi
            | Self::WaistCircumference
            | Self::Alcohol
            | Self::Energy
            | Self::Sugar
            | Self::Fiber
            | Self::VitaminC
            | Self::Calcium
            | Self::PhysicalHealthDays
            | Self::MentalHealthDays
            | Self::ActivityLimitationDays
            | Self::ChronicCount
            | Self::Weight
            | Self::Stratum
            | Self::Psu => VariableKind::Continuous,
            Self::PerioCase
            | Self::Diabetes
            | Self::Hypertension
            | Self::HighCholesterol
            | Self::Cvd
            | Self::HasInsurance
            | Self::AnyChronic
            | Self::Multimorbidity => VariableKind::Binary,
            _ => VariableKind::Categorical,
        }
    }

    /// Levels in display order; binary variables read as `No`/`Yes`
    #[must_use]
    pub const fn levels(self) -> &'static [&'static str] {
        match self {
            Self::PerioStatus => PerioStatus::LABELS,
            Self::Sex => Sex::LABELS,
            Self::Race => RaceEthnicity::LABELS,
            Self::Education => Education::LABELS,
            Self::EducationTier => EducationTier::LABELS,
            Self::MaritalStatus => MaritalStatus::LABELS,
            Self::Smoking => SmokingStatus::LABELS,
            Self::BmiCategory => BmiCategory::LABELS,
            Self::Flossing => Flossing::LABELS,
            Self::PhysicalActivity => PhysicalActivity::LABELS,
            Self::ActivityLevel => ActivityLevel::LABELS,
            Self::AgeGroup => AgeGroup::LABELS,
            Self::ChronicCategory => ChronicCategory::LABELS,
            Self::GeneralHealth => GeneralHealth::LABELS,
            _ => match self.kind() {
                VariableKind::Binary => BINARY_LEVELS,
                _ => &[],
            },
        }
    }

    /// Default reference level for dummy coding
    #[must_use]
    pub const fn default_reference(self) -> Option<&'static str> {
        match self {
            Self::PerioStatus => Some("None"),
            Self::Sex => Some("Male"),
            Self::Race => Some("Non-Hispanic White"),
            Self::Education => Some("College Graduate+"),
            Self::EducationTier => Some(">HS"),
            Self::MaritalStatus => Some("Married/Partner"),
            Self::Smoking => Some("Never"),
            Self::BmiCategory => Some("Normal"),
            Self::Flossing => Some("Daily"),
            Self::PhysicalActivity => Some("Active"),
            Self::ActivityLevel => Some("Low"),
            Self::AgeGroup => Some("60-69"),
            Self::ChronicCategory => Some("0"),
            Self::GeneralHealth => Some("Excellent"),
            _ => None,
        }
    }

    /// Raw fields the variable is computed from
    #[must_use]
    pub const fn source_fields(self) -> &'static [RawField] {
        match self {
            Self::Age | Self::AgeGroup => &[RawField::Age],
            Self::Sex => &[RawField::Sex],
            Self::Race => &[RawField::RaceEthnicity],
            Self::Education | Self::EducationTier => &[RawField::Education],
            Self::MaritalStatus => &[RawField::MaritalStatus],
            Self::PovertyRatio => &[RawField::PovertyRatio],
            Self::Weight => &[RawField::ExamWeight],
            Self::Stratum => &[RawField::Stratum],
            Self::Psu => &[RawField::Psu],
            Self::Energy => &[RawField::Energy],
            Self::Sugar => &[RawField::Sugar],
            Self::Fiber => &[RawField::Fiber],
            Self::VitaminC => &[RawField::VitaminC],
            Self::Calcium => &[RawField::Calcium],
            Self::Bmi | Self::BmiCategory => &[RawField::Bmi],
            Self::WaistCircumference => &[RawField::WaistCircumference],
            Self::Smoking => &[RawField::SmokedLifetime, RawField::SmokingNow],
            Self::Alcohol => &[RawField::EverDrinker, RawField::DrinksPerDay],
            Self::PhysicalActivity => &[RawField::VigorousWork, RawField::ModerateWork],
            Self::ActivityLevel => &[
                RawField::VigorousWork,
                RawField::ModerateWork,
                RawField::VigorousRecreation,
                RawField::ModerateRecreation,
            ],
            Self::Flossing => &[RawField::FlossingDays],
            Self::Diabetes => &[RawField::DiabetesDiagnosis],
            Self::Hypertension => &[RawField::Hypertension],
            Self::HighCholesterol => &[RawField::HighCholesterol],
            Self::Cvd => &[RawField::ChestPain, RawField::SevereChestPain],
            Self::ChronicCount
            | Self::ChronicCategory
            | Self::AnyChronic
            | Self::Multimorbidity => &[
                RawField::DiabetesDiagnosis,
                RawField::Hypertension,
                RawField::HighCholesterol,
                RawField::ChestPain,
                RawField::SevereChestPain,
            ],
            Self::HasInsurance => &[RawField::Insurance],
            Self::PhysicalHealthDays => &[RawField::PhysicalUnhealthyDays],
            Self::MentalHealthDays => &[RawField::MentalUnhealthyDays],
            Self::ActivityLimitationDays => &[RawField::ActivityLimitedDays],
            Self::GeneralHealth => &[RawField::GeneralHealth],
            // Staged from the exam grid rather than a declared field
            Self::PerioStatus | Self::PerioCase => &[],
        }
    }

    /// Whether the variable can be computed given the unavailable raw fields
    ///
    /// A variable is unavailable only when every one of its source fields is.
    #[must_use]
    pub fn is_available(self, unavailable: &[RawField]) -> bool {
        let sources = self.source_fields();
        sources.is_empty() || sources.iter().any(|field| !unavailable.contains(field))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn number(value: Option<f64>) -> Value {
    value.map_or(Value::Missing, Value::Number)
}

fn flag(value: Option<bool>) -> Value {
    value.map_or(Value::Missing, |v| Value::Number(if v { 1.0 } else { 0.0 }))
}

fn category(label: Option<&'static str>) -> Value {
    label.map_or(Value::Missing, Value::Category)
}

impl SubjectRecord {
    /// Value of an analysis variable
    #[must_use]
    pub fn value(&self, variable: Variable) -> Value {
        let d = &self.derived;
        let raw = &self.raw;
        match variable {
            Variable::Age => number(d.age),
            Variable::PovertyRatio => number(d.poverty_ratio),
            Variable::Bmi => number(d.bmi),
            Variable::WaistCircumference => number(raw.get(RawField::WaistCircumference)),
            Variable::Alcohol => number(d.alcohol),
            Variable::Energy => number(raw.get(RawField::Energy)),
            Variable::Sugar => number(raw.get(RawField::Sugar)),
            Variable::Fiber => number(raw.get(RawField::Fiber)),
            Variable::VitaminC => number(raw.get(RawField::VitaminC)),
            Variable::Calcium => number(raw.get(RawField::Calcium)),
            Variable::PhysicalHealthDays => number(d.physical_health_days),
            Variable::MentalHealthDays => number(d.mental_health_days),
            Variable::ActivityLimitationDays => number(d.activity_limitation_days),
            Variable::ChronicCount => number(d.chronic_count.map(f64::from)),
            Variable::Weight => number(d.weight),
            Variable::Stratum => number(raw.get(RawField::Stratum)),
            Variable::Psu => number(raw.get(RawField::Psu)),
            Variable::PerioCase => flag(d.perio_case),
            Variable::Diabetes => flag(d.diabetes),
            Variable::Hypertension => flag(d.hypertension),
            Variable::HighCholesterol => flag(d.high_cholesterol),
            Variable::Cvd => flag(d.cvd),
            Variable::HasInsurance => flag(d.has_insurance),
            Variable::AnyChronic => flag(d.chronic_count.map(|n| n >= 1)),
            Variable::Multimorbidity => flag(d.chronic_count.map(|n| n >= 2)),
            Variable::PerioStatus => category(d.perio_status.map(PerioStatus::description)),
            Variable::Sex => category(d.sex.map(Sex::label)),
            Variable::Race => category(d.race.map(RaceEthnicity::label)),
            Variable::Education => category(d.education.map(Education::label)),
            Variable::EducationTier => category(d.education_tier.map(EducationTier::label)),
            Variable::MaritalStatus => category(d.marital_status.map(MaritalStatus::label)),
            Variable::Smoking => category(d.smoking.map(SmokingStatus::label)),
            Variable::BmiCategory => category(d.bmi_category.map(BmiCategory::label)),
            Variable::Flossing => category(d.flossing.map(Flossing::label)),
            Variable::PhysicalActivity => {
                category(d.physical_activity.map(PhysicalActivity::label))
            }
            Variable::ActivityLevel => category(d.activity_level.map(ActivityLevel::label)),
            Variable::AgeGroup => category(d.age_group.map(AgeGroup::label)),
            Variable::ChronicCategory => category(d.chronic_category.map(ChronicCategory::label)),
            Variable::GeneralHealth => category(d.general_health.map(GeneralHealth::label)),
        }
    }

    /// Level label of a categorical or binary variable
    #[must_use]
    pub fn level(&self, variable: Variable) -> Option<&'static str> {
        match self.value(variable) {
            Value::Category(label) => Some(label),
            Value::Number(v) if variable.kind() == VariableKind::Binary => {
                Some(if v > 0.5 { BINARY_LEVELS[1] } else { BINARY_LEVELS[0] })
            }
            _ => None,
        }
    }

    /// Whether the variable is missing for this record
    #[must_use]
    pub fn is_missing(&self, variable: Variable) -> bool {
        self.value(variable).is_missing()
    }

    /// Set a continuous variable to missing
    ///
    /// Returns `false`, leaving the record untouched, for variables that are
    /// not continuous. Values derived earlier from the cleared one (such as
    /// the age group) are kept.
    pub fn clear(&mut self, variable: Variable) -> bool {
        let d = &mut self.derived;
        match variable {
            Variable::Age => d.age = None,
            Variable::PovertyRatio => d.poverty_ratio = None,
            Variable::Bmi => d.bmi = None,
            Variable::Alcohol => d.alcohol = None,
            Variable::PhysicalHealthDays => d.physical_health_days = None,
            Variable::MentalHealthDays => d.mental_health_days = None,
            Variable::ActivityLimitationDays => d.activity_limitation_days = None,
            Variable::ChronicCount => d.chronic_count = None,
            Variable::Weight => d.weight = None,
            Variable::WaistCircumference => self.raw.set(RawField::WaistCircumference, None),
            Variable::Energy => self.raw.set(RawField::Energy, None),
            Variable::Sugar => self.raw.set(RawField::Sugar, None),
            Variable::Fiber => self.raw.set(RawField::Fiber, None),
            Variable::VitaminC => self.raw.set(RawField::VitaminC, None),
            Variable::Calcium => self.raw.set(RawField::Calcium, None),
            Variable::Stratum => self.raw.set(RawField::Stratum, None),
            Variable::Psu => self.raw.set(RawField::Psu, None),
            _ => return false,
        }
        true
    }
}
