//! Tests for variable derivation from raw survey codes

use nhanes_cohort::models::types::{
    ActivityLevel, AgeGroup, BmiCategory, ChronicCategory, Education, EducationTier, Flossing,
    SmokingStatus,
};
use nhanes_cohort::{Cycle, DeriveConfig, RawField, RawRecord, Value, Variable, derive_all, derive_record};

fn raw(id: i64) -> RawRecord {
    RawRecord::new(id, Cycle::new("H"))
}

#[test]
fn test_pooled_weight_divides_by_cycle_count() {
    let record = raw(1).with(RawField::ExamWeight, 9000.0);
    let three = DeriveConfig::default().with_cycles(3);
    assert_eq!(derive_record(&record, &three).weight, Some(3000.0));

    let one = DeriveConfig::default();
    assert_eq!(derive_record(&record, &one).weight, Some(9000.0));

    let negative = raw(2).with(RawField::ExamWeight, -1.0);
    assert_eq!(derive_record(&negative, &three).weight, None);
}

#[test]
fn test_older_man_chronic_profile() {
    let record = raw(10)
        .with(RawField::Age, 81.0)
        .with(RawField::Sex, 1.0)
        .with(RawField::DiabetesDiagnosis, 3.0)
        .with(RawField::Hypertension, 1.0)
        .with(RawField::HighCholesterol, 1.0)
        .with(RawField::ChestPain, 2.0)
        .with(RawField::SevereChestPain, 1.0)
        .with(RawField::PhysicalUnhealthyDays, 12.0)
        .with(RawField::MentalUnhealthyDays, 77.0)
        .with(RawField::ActivityLimitedDays, 0.0);

    let strict = derive_record(&record, &DeriveConfig::default());
    assert_eq!(strict.age_group, Some(AgeGroup::Age80Plus));
    assert_eq!(strict.diabetes, Some(false));
    assert_eq!(strict.cvd, Some(true));
    assert_eq!(strict.chronic_count, Some(3));
    assert_eq!(strict.chronic_category, Some(ChronicCategory::ThreeOrMore));
    assert_eq!(strict.physical_health_days, Some(12.0));
    assert_eq!(strict.mental_health_days, None);
    assert_eq!(strict.activity_limitation_days, Some(0.0));

    let borderline = DeriveConfig {
        borderline_diabetes_as_yes: true,
        ..DeriveConfig::default()
    };
    let lenient = derive_record(&record, &borderline);
    assert_eq!(lenient.diabetes, Some(true));
    assert_eq!(lenient.chronic_count, Some(4));
}

#[test]
fn test_missing_conditions_do_not_count() {
    let record = raw(11)
        .with(RawField::Hypertension, 1.0)
        .with(RawField::HighCholesterol, 9.0);
    let derived = derive_record(&record, &DeriveConfig::default());
    assert_eq!(derived.high_cholesterol, None);
    assert_eq!(derived.chronic_count, Some(1));

    let nothing = derive_record(&raw(12), &DeriveConfig::default());
    assert_eq!(nothing.chronic_count, None);
    assert_eq!(nothing.chronic_category, None);
}

#[test]
fn test_socioeconomic_recodes() {
    let record = raw(20)
        .with(RawField::Education, 2.0)
        .with(RawField::PovertyRatio, 6.3)
        .with(RawField::Insurance, 2.0)
        .with(RawField::SmokedLifetime, 1.0)
        .with(RawField::SmokingNow, 3.0);
    let derived = derive_record(&record, &DeriveConfig::default());
    assert_eq!(derived.education, Some(Education::LessThanHighSchool));
    assert_eq!(derived.education_tier, Some(EducationTier::BelowHighSchool));
    assert_eq!(derived.poverty_ratio, Some(5.0));
    assert_eq!(derived.has_insurance, Some(false));
    assert_eq!(derived.smoking, Some(SmokingStatus::Former));

    let refused = raw(21).with(RawField::Education, 7.0);
    assert_eq!(derive_record(&refused, &DeriveConfig::default()).education, None);
}

#[test]
fn test_lifestyle_recodes() {
    let record = raw(30)
        .with(RawField::Bmi, 24.99)
        .with(RawField::FlossingDays, 7.0)
        .with(RawField::VigorousWork, 2.0)
        .with(RawField::VigorousRecreation, 2.0)
        .with(RawField::ModerateRecreation, 1.0)
        .with(RawField::EverDrinker, 2.0);
    let derived = derive_record(&record, &DeriveConfig::default());
    assert_eq!(derived.bmi_category, Some(BmiCategory::Normal));
    assert_eq!(derived.flossing, Some(Flossing::Daily));
    assert_eq!(derived.activity_level, Some(ActivityLevel::Moderate));
    assert_eq!(derived.alcohol, Some(0.0));
}

#[test]
fn test_variables_read_through_records() {
    let records = derive_all(
        vec![
            raw(1)
                .with(RawField::Age, 64.0)
                .with(RawField::Hypertension, 1.0)
                .with(RawField::DiabetesDiagnosis, 1.0),
            raw(2).with(RawField::Age, 45.0).with(RawField::Sugar, 88.0),
        ],
        &DeriveConfig::default(),
    );
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].subject_id(), 1);

    let first = &records[0];
    assert_eq!(first.value(Variable::AgeGroup), Value::Category("60-69"));
    assert_eq!(first.value(Variable::Multimorbidity), Value::Number(1.0));
    assert_eq!(first.level(Variable::AnyChronic), Some("Yes"));

    let second = &records[1];
    assert_eq!(second.value(Variable::AgeGroup), Value::Missing);
    assert_eq!(second.value(Variable::Sugar), Value::Number(88.0));
    assert!(second.is_missing(Variable::ChronicCount));
}
