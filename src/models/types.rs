//! Common domain type definitions
//!
//! Semantic categories produced by the variable recodes. Every category has a
//! fixed label used in output tables and as the dummy-column suffix in models.
//! Codes outside a category's domain never map to a guessed value; the recode
//! returns `None` instead.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! labelled_category {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// All levels in display order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Labels of all levels in display order
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            /// Output label of this level
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            /// Look up a level by its label
            #[must_use]
            pub fn from_label(label: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|level| level.label() == label)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    };
}

labelled_category! {
    /// Sex as recorded at screening
    pub enum Sex {
        /// Code 1
        Male => "Male",
        /// Code 2
        Female => "Female",
    }
}

labelled_category! {
    /// Race/Hispanic origin (`RIDRETH1`)
    pub enum RaceEthnicity {
        /// Code 1
        MexicanAmerican => "Mexican American",
        /// Code 2
        OtherHispanic => "Other Hispanic",
        /// Code 3
        NonHispanicWhite => "Non-Hispanic White",
        /// Code 4
        NonHispanicBlack => "Non-Hispanic Black",
        /// Code 5, other race including multi-racial
        Other => "Other/Multi-racial",
    }
}

labelled_category! {
    /// Four-level education attainment (`DMDEDUC2`)
    pub enum Education {
        /// Codes 1-2: less than 9th grade, or 9-11th grade
        LessThanHighSchool => "< High School",
        /// Code 3: high school graduate or GED
        HighSchoolGraduate => "High School Graduate",
        /// Code 4: some college or AA degree
        SomeCollege => "Some College",
        /// Code 5: college graduate or above
        CollegeGraduate => "College Graduate+",
    }
}

labelled_category! {
    /// Three-tier education collapse
    pub enum EducationTier {
        /// Codes 1-2
        BelowHighSchool => "<HS",
        /// Code 3
        HighSchoolOrGed => "HS/GED",
        /// Codes 4-5
        AboveHighSchool => ">HS",
    }
}

labelled_category! {
    /// Marital status (`DMDMARTL`)
    pub enum MaritalStatus {
        /// Codes 1 (married) and 6 (living with partner)
        MarriedOrPartner => "Married/Partner",
        /// Code 2
        Widowed => "Widowed",
        /// Codes 3 (divorced) and 4 (separated)
        DivorcedOrSeparated => "Divorced/Separated",
        /// Code 5
        NeverMarried => "Never Married",
    }
}

labelled_category! {
    /// Cigarette smoking status from lifetime and current use
    pub enum SmokingStatus {
        /// Fewer than 100 cigarettes in life
        Never => "Never",
        /// At least 100 cigarettes, not smoking now
        Former => "Former",
        /// Smoking every day or some days
        Current => "Current",
    }
}

labelled_category! {
    /// BMI category with cutpoints 18.5 / 25 / 30
    pub enum BmiCategory {
        /// BMI < 18.5
        Underweight => "Underweight",
        /// 18.5 <= BMI < 25
        Normal => "Normal",
        /// 25 <= BMI < 30
        Overweight => "Overweight",
        /// BMI >= 30
        Obese => "Obese",
    }
}

labelled_category! {
    /// Flossing frequency from days per week (`OHQ870`)
    pub enum Flossing {
        /// 0 days
        Never => "Never",
        /// 1-3 days
        Infrequent => "Infrequent",
        /// 4-6 days
        Frequent => "Frequent",
        /// 7 days
        Daily => "Daily",
    }
}

labelled_category! {
    /// Work-related physical activity
    pub enum PhysicalActivity {
        /// Vigorous or moderate work activity
        Active => "Active",
        /// Neither
        Inactive => "Inactive",
    }
}

labelled_category! {
    /// Activity level across work and recreation
    pub enum ActivityLevel {
        /// No vigorous and no moderate activity
        Low => "Low",
        /// Moderate but no vigorous activity
        Moderate => "Moderate",
        /// Any vigorous activity
        High => "High",
    }
}

labelled_category! {
    /// Age group of older adults
    pub enum AgeGroup {
        /// 60 to 69 years
        Age60To69 => "60-69",
        /// 70 to 79 years
        Age70To79 => "70-79",
        /// 80 years and over (top-coded at 80 in the survey)
        Age80Plus => "80+",
    }
}

labelled_category! {
    /// Number of chronic conditions, top-coded at three
    pub enum ChronicCategory {
        /// No reported condition
        Zero => "0",
        /// One condition
        One => "1",
        /// Two conditions
        Two => "2",
        /// Three or more conditions
        ThreeOrMore => "3+",
    }
}

labelled_category! {
    /// Self-rated general health (`HSD010`)
    pub enum GeneralHealth {
        /// Code 1
        Excellent => "Excellent",
        /// Code 2
        VeryGood => "Very Good",
        /// Code 3
        Good => "Good",
        /// Code 4
        Fair => "Fair",
        /// Code 5
        Poor => "Poor",
    }
}

impl Sex {
    /// Map a `RIAGENDR` code
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Male),
            2 => Some(Self::Female),
            _ => None,
        }
    }
}

impl RaceEthnicity {
    /// Map a `RIDRETH1` code
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::MexicanAmerican),
            2 => Some(Self::OtherHispanic),
            3 => Some(Self::NonHispanicWhite),
            4 => Some(Self::NonHispanicBlack),
            5 => Some(Self::Other),
            _ => None,
        }
    }
}

impl Education {
    /// Map a `DMDEDUC2` code
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 | 2 => Some(Self::LessThanHighSchool),
            3 => Some(Self::HighSchoolGraduate),
            4 => Some(Self::SomeCollege),
            5 => Some(Self::CollegeGraduate),
            _ => None,
        }
    }

    /// Collapse to the three-tier scheme
    #[must_use]
    pub const fn tier(self) -> EducationTier {
        match self {
            Self::LessThanHighSchool => EducationTier::BelowHighSchool,
            Self::HighSchoolGraduate => EducationTier::HighSchoolOrGed,
            Self::SomeCollege | Self::CollegeGraduate => EducationTier::AboveHighSchool,
        }
    }
}

impl MaritalStatus {
    /// Map a `DMDMARTL` code
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 | 6 => Some(Self::MarriedOrPartner),
            2 => Some(Self::Widowed),
            3 | 4 => Some(Self::DivorcedOrSeparated),
            5 => Some(Self::NeverMarried),
            _ => None,
        }
    }
}

impl GeneralHealth {
    /// Map a `HSD010` code
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Excellent),
            2 => Some(Self::VeryGood),
            3 => Some(Self::Good),
            4 => Some(Self::Fair),
            5 => Some(Self::Poor),
            _ => None,
        }
    }
}
