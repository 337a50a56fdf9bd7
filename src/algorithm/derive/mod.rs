//! Variable derivation
//!
//! [`derive_record`] is a pure function of one raw record and the derivation
//! settings. A missing or out-of-domain input only makes the fields computed
//! from it missing.

pub mod recode;

use std::time::Instant;

use rayon::prelude::*;

use crate::algorithm::periodontitis::{classify_periodontitis, periodontal_case};
use crate::config::DeriveConfig;
use crate::models::record::{DerivedFields, RawRecord, SubjectRecord};
use crate::models::types::{Education, GeneralHealth, MaritalStatus, RaceEthnicity, Sex};
use crate::schema::RawField;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Compute every derived field of one record
#[must_use]
pub fn derive_record(raw: &RawRecord, config: &DeriveConfig) -> DerivedFields {
    let perio_status = classify_periodontitis(&raw.perio);

    let age = raw.get(RawField::Age).filter(|a| *a >= 0.0);
    let education = raw.code(RawField::Education).and_then(Education::from_code);
    let bmi = raw.get(RawField::Bmi).filter(|b| *b > 0.0);

    let diabetes = recode::diabetes(
        raw.code(RawField::DiabetesDiagnosis),
        config.borderline_diabetes_as_yes,
    );
    let hypertension = recode::yes_no(raw.code(RawField::Hypertension));
    let high_cholesterol = recode::yes_no(raw.code(RawField::HighCholesterol));
    let cvd = recode::either_yes(
        raw.code(RawField::ChestPain),
        raw.code(RawField::SevereChestPain),
    );
    let chronic_count =
        recode::chronic_count(&[diabetes, hypertension, high_cholesterol, cvd]);

    let vigorous = recode::either_yes(
        raw.code(RawField::VigorousWork),
        raw.code(RawField::VigorousRecreation),
    );
    let moderate = recode::either_yes(
        raw.code(RawField::ModerateWork),
        raw.code(RawField::ModerateRecreation),
    );

    DerivedFields {
        perio_status,
        perio_case: periodontal_case(perio_status),
        sex: raw.code(RawField::Sex).and_then(Sex::from_code),
        age,
        age_group: recode::age_group(age),
        race: raw.code(RawField::RaceEthnicity).and_then(RaceEthnicity::from_code),
        education,
        education_tier: education.map(Education::tier),
        marital_status: raw.code(RawField::MaritalStatus).and_then(MaritalStatus::from_code),
        poverty_ratio: recode::poverty_ratio(
            raw.get(RawField::PovertyRatio),
            config.poverty_ratio_cap,
        ),
        has_insurance: recode::yes_no(raw.code(RawField::Insurance)),
        smoking: recode::smoking(
            raw.code(RawField::SmokedLifetime),
            raw.code(RawField::SmokingNow),
        ),
        alcohol: recode::alcohol(
            raw.code(RawField::EverDrinker),
            raw.get(RawField::DrinksPerDay),
        ),
        physical_activity: recode::physical_activity(
            raw.code(RawField::VigorousWork),
            raw.code(RawField::ModerateWork),
        ),
        activity_level: recode::activity_level(vigorous, moderate),
        flossing: recode::flossing(raw.get(RawField::FlossingDays)),
        bmi,
        bmi_category: recode::bmi_category(bmi),
        diabetes,
        hypertension,
        high_cholesterol,
        cvd,
        chronic_count,
        chronic_category: recode::chronic_category(chronic_count),
        physical_health_days: recode::recall_days(raw.get(RawField::PhysicalUnhealthyDays)),
        mental_health_days: recode::recall_days(raw.get(RawField::MentalUnhealthyDays)),
        activity_limitation_days: recode::recall_days(raw.get(RawField::ActivityLimitedDays)),
        general_health: raw.code(RawField::GeneralHealth).and_then(GeneralHealth::from_code),
        weight: recode::pooled_weight(raw.get(RawField::ExamWeight), config.n_cycles),
    }
}

/// Derive every record in parallel, preserving order
#[must_use]
pub fn derive_all(records: Vec<RawRecord>, config: &DeriveConfig) -> Vec<SubjectRecord> {
    let start = Instant::now();
    log_operation_start("Deriving variables for", &format!("{} records", records.len()));

    let derived: Vec<SubjectRecord> = records
        .into_par_iter()
        .map(|raw| {
            let derived = derive_record(&raw, config);
            SubjectRecord { raw, derived }
        })
        .collect();

    log_operation_complete("derived", "variables", derived.len(), Some(start.elapsed()));
    derived
}
