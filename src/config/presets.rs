//! Bundled study configurations
//!
//! * Dietary intake and periodontitis in adults aged 30 and over, pooled over
//!   cycles F to H, with a logistic Model 1/2/3 grid per nutrient.
//! * Chronic conditions and unhealthy days in men aged 60 and over, pooled
//!   over cycles B to J, with linear and negative-binomial models and a
//!   sensitivity plan.

use std::path::PathBuf;

use crate::algorithm::cohort::ExclusionStage;
use crate::algorithm::descriptive::{DescriptivePlan, OutcomeThreshold};
use crate::algorithm::regression::{
    AdjustmentSet, ExposureGrid, Family, ModelPlan, ModelSpec, SensitivityPlan, Term,
};
use crate::config::{DeriveConfig, LoaderConfig, OutputFormat, StudyConfig};
use crate::models::types::Sex;
use crate::models::Variable;
use crate::schema::{Cycle, Domain};

/// Nutrients screened for implausible intakes
pub const DIETARY_OUTLIER_VARIABLES: [Variable; 5] = [
    Variable::Sugar,
    Variable::Fiber,
    Variable::VitaminC,
    Variable::Calcium,
    Variable::Energy,
];

/// Older-men variables whose extreme values are set to missing
pub const OLDER_MEN_OUTLIER_VARIABLES: [Variable; 6] = [
    Variable::Age,
    Variable::PhysicalHealthDays,
    Variable::MentalHealthDays,
    Variable::ActivityLimitationDays,
    Variable::Bmi,
    Variable::PovertyRatio,
];

/// Age at which age is centered in the older-men models
pub const AGE_CENTER: f64 = 70.0;

fn terms(variables: &[Variable]) -> Vec<Term> {
    variables.iter().copied().map(Term::Variable).collect()
}

impl StudyConfig {
    /// Dietary intake and periodontitis, NHANES 2009-2014
    pub fn diet_periodontitis(data_dir: impl Into<PathBuf>) -> Self {
        let covariates_required = vec![
            Variable::PerioCase,
            Variable::Race,
            Variable::EducationTier,
            Variable::Smoking,
            Variable::Diabetes,
            Variable::Alcohol,
            Variable::PhysicalActivity,
            Variable::Flossing,
            Variable::Bmi,
            Variable::PovertyRatio,
            Variable::Sugar,
            Variable::Fiber,
            Variable::VitaminC,
            Variable::Calcium,
            Variable::Energy,
        ];

        let demographic = [Variable::Age, Variable::Sex, Variable::Race, Variable::Energy];
        let full = [
            Variable::Age,
            Variable::Sex,
            Variable::Race,
            Variable::Energy,
            Variable::EducationTier,
            Variable::PovertyRatio,
            Variable::Smoking,
            Variable::Bmi,
            Variable::Diabetes,
            Variable::Alcohol,
            Variable::PhysicalActivity,
            Variable::Flossing,
        ];

        Self {
            name: "diet-periodontitis".to_string(),
            loader: LoaderConfig::new(data_dir),
            cycles: Cycle::list(["F", "G", "H"]),
            domains: vec![
                Domain::Demo,
                Domain::Dr1Tot,
                Domain::Ohxper,
                Domain::Bmx,
                Domain::Smq,
                Domain::Diq,
                Domain::Alq,
                Domain::Paq,
                Domain::Ohq,
            ],
            derive: DeriveConfig::default(),
            stages: vec![
                ExclusionStage::TotalPopulation,
                ExclusionStage::MinimumAge { years: 30.0 },
                ExclusionStage::PerioExamComplete,
                ExclusionStage::DietRecallReliable,
                ExclusionStage::CompleteCase {
                    variables: covariates_required,
                },
                ExclusionStage::OutlierRejection {
                    variables: DIETARY_OUTLIER_VARIABLES.to_vec(),
                    z_threshold: 4.0,
                },
            ],
            descriptive: DescriptivePlan {
                stratify_by: Some(Variable::PerioCase),
                continuous: vec![
                    Variable::Age,
                    Variable::PovertyRatio,
                    Variable::Bmi,
                    Variable::Alcohol,
                    Variable::Energy,
                    Variable::Sugar,
                    Variable::Fiber,
                    Variable::VitaminC,
                    Variable::Calcium,
                ],
                categorical: vec![
                    Variable::Sex,
                    Variable::Race,
                    Variable::EducationTier,
                    Variable::Smoking,
                    Variable::Diabetes,
                    Variable::PhysicalActivity,
                    Variable::Flossing,
                ],
                outcomes: Vec::new(),
            },
            models: ModelPlan {
                grid: Some(ExposureGrid {
                    outcome: Variable::PerioCase,
                    family: Family::BinomialLogit,
                    exposures: terms(&[
                        Variable::Sugar,
                        Variable::Fiber,
                        Variable::VitaminC,
                        Variable::Calcium,
                    ]),
                    adjustment_sets: vec![
                        AdjustmentSet::new("Model 1", Vec::new()),
                        AdjustmentSet::new("Model 2", terms(&demographic)),
                        AdjustmentSet::new("Model 3", terms(&full)),
                    ],
                }),
                ..ModelPlan::default()
            },
            sensitivity: None,
            threads: None,
            output_dir: None,
            output_format: OutputFormat::Csv,
            show_progress: false,
        }
    }

    /// Chronic conditions and physically unhealthy days in older men,
    /// NHANES 2001-2018
    pub fn older_men_health_days(data_dir: impl Into<PathBuf>) -> Self {
        let chronic_only = vec![Term::Variable(Variable::ChronicCategory)];

        let mut demographic = chronic_only.clone();
        demographic.push(Term::Centered {
            variable: Variable::Age,
            at: AGE_CENTER,
        });
        demographic.push(Term::Variable(Variable::Race));

        let mut full = demographic.clone();
        full.extend(terms(&[
            Variable::Education,
            Variable::PovertyRatio,
            Variable::HasInsurance,
            Variable::MaritalStatus,
            Variable::Smoking,
            Variable::ActivityLevel,
            Variable::BmiCategory,
        ]));

        let negative_binomial = Family::NegativeBinomial { alpha: 1.0 };
        let models = vec![
            ModelSpec::new(
                "Model 1: Crude",
                Variable::PhysicalHealthDays,
                Family::Gaussian,
                chronic_only,
            ),
            ModelSpec::new(
                "Model 2: Demographic-adjusted",
                Variable::PhysicalHealthDays,
                Family::Gaussian,
                demographic,
            ),
            ModelSpec::new(
                "Model 3: Fully adjusted",
                Variable::PhysicalHealthDays,
                Family::Gaussian,
                full.clone(),
            ),
            ModelSpec::new(
                "Model 4: Negative Binomial",
                Variable::PhysicalHealthDays,
                negative_binomial,
                full.clone(),
            ),
            ModelSpec::new(
                "Mental Health Days",
                Variable::MentalHealthDays,
                negative_binomial,
                full.clone(),
            ),
            ModelSpec::new(
                "Activity Limitation Days",
                Variable::ActivityLimitationDays,
                negative_binomial,
                full.clone(),
            ),
        ];

        let mut alternative_covariates = vec![Term::Centered {
            variable: Variable::Age,
            at: AGE_CENTER,
        }];
        alternative_covariates.extend(terms(&[
            Variable::Race,
            Variable::Education,
            Variable::PovertyRatio,
        ]));

        Self {
            name: "older-men-health-days".to_string(),
            loader: LoaderConfig::new(data_dir),
            cycles: Cycle::list(["B", "C", "D", "E", "F", "G", "H", "I", "J"]),
            domains: vec![
                Domain::Demo,
                Domain::Hsq,
                Domain::Diq,
                Domain::Bpq,
                Domain::Cdq,
                Domain::Paq,
                Domain::Smq,
                Domain::Bmx,
                Domain::Hiq,
            ],
            derive: DeriveConfig {
                borderline_diabetes_as_yes: true,
                ..DeriveConfig::default()
            },
            stages: vec![
                ExclusionStage::TotalPopulation,
                ExclusionStage::MinimumAge { years: 60.0 },
                ExclusionStage::Sex { sex: Sex::Male },
                ExclusionStage::OutlierMasking {
                    variables: OLDER_MEN_OUTLIER_VARIABLES.to_vec(),
                    z_threshold: 4.0,
                },
                ExclusionStage::OutcomeAvailable {
                    outcome: Variable::PhysicalHealthDays,
                },
                ExclusionStage::CompleteCase {
                    variables: vec![
                        Variable::ChronicCount,
                        Variable::Age,
                        Variable::Race,
                        Variable::Weight,
                        Variable::Stratum,
                        Variable::Psu,
                    ],
                },
            ],
            descriptive: DescriptivePlan {
                stratify_by: Some(Variable::ChronicCategory),
                continuous: vec![
                    Variable::Age,
                    Variable::PovertyRatio,
                    Variable::Bmi,
                    Variable::PhysicalHealthDays,
                    Variable::MentalHealthDays,
                    Variable::ActivityLimitationDays,
                ],
                categorical: vec![
                    Variable::AgeGroup,
                    Variable::Race,
                    Variable::Education,
                    Variable::MaritalStatus,
                    Variable::Smoking,
                    Variable::ActivityLevel,
                    Variable::BmiCategory,
                    Variable::HasInsurance,
                    Variable::GeneralHealth,
                ],
                outcomes: vec![
                    OutcomeThreshold::new(Variable::PhysicalHealthDays, 14.0),
                    OutcomeThreshold::new(Variable::MentalHealthDays, 14.0),
                    OutcomeThreshold::new(Variable::ActivityLimitationDays, 14.0),
                ],
            },
            models: ModelPlan {
                models,
                ..ModelPlan::default()
            },
            sensitivity: Some(SensitivityPlan {
                outcome: Variable::PhysicalHealthDays,
                exposure: Term::Variable(Variable::ChronicCategory),
                covariates: full,
                nb_alpha: 1.0,
                stratify_by: Variable::AgeGroup,
                min_stratum_size: 50,
                alternative_exposures: vec![
                    Variable::Diabetes,
                    Variable::Hypertension,
                    Variable::Cvd,
                    Variable::HighCholesterol,
                    Variable::AnyChronic,
                    Variable::Multimorbidity,
                ],
                alternative_covariates,
                available_case_variables: vec![
                    Variable::PhysicalHealthDays,
                    Variable::ChronicCount,
                    Variable::Age,
                    Variable::Race,
                    Variable::Education,
                    Variable::PovertyRatio,
                    Variable::Smoking,
                    Variable::Bmi,
                ],
                overdispersion_threshold: 1.5,
            }),
            threads: None,
            output_dir: None,
            output_format: OutputFormat::Csv,
            show_progress: false,
        }
    }
}
