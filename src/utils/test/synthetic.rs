//! Seeded synthetic cohorts
//!
//! The generators produce derived records directly, so regression and
//! descriptive code can be exercised without going through CSV tables. The
//! same seed always yields the same cohort.

use rand::prelude::*;

use crate::algorithm::derive::recode::{age_group, chronic_category};
use crate::models::record::{DerivedFields, RawRecord, SubjectRecord};
use crate::models::types::{RaceEthnicity, Sex, SmokingStatus};
use crate::schema::{Cycle, RawField};

fn race(rng: &mut StdRng) -> RaceEthnicity {
    match rng.random_range(0..4) {
        0 => RaceEthnicity::NonHispanicWhite,
        1 => RaceEthnicity::NonHispanicBlack,
        2 => RaceEthnicity::MexicanAmerican,
        _ => RaceEthnicity::Other,
    }
}

/// Older men with chronic conditions and unhealthy-day counts
///
/// Days rise with the number of conditions; roughly half the men report
/// zero days.
#[must_use]
pub fn older_men_cohort(n: usize, seed: u64) -> Vec<SubjectRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let age = f64::from(rng.random_range(60..=85_u8));
            let conditions = [
                rng.random_bool(0.25),
                rng.random_bool(0.55),
                rng.random_bool(0.45),
                rng.random_bool(0.15),
            ];
            let count = conditions.iter().filter(|c| **c).count() as u8;
            let days = if rng.random_bool(0.5) {
                0.0
            } else {
                let mean = 2.0 + 3.0 * f64::from(count);
                (mean * rng.random_range(0.0..2.0)).round().min(30.0)
            };
            let cycle = if i % 2 == 0 { "B" } else { "C" };
            SubjectRecord {
                raw: RawRecord::new(i as i64 + 1, Cycle::new(cycle))
                    .with(RawField::Stratum, f64::from(rng.random_range(1..=15_u8)))
                    .with(RawField::Psu, f64::from(rng.random_range(1..=2_u8))),
                derived: DerivedFields {
                    sex: Some(Sex::Male),
                    age: Some(age),
                    age_group: age_group(Some(age)),
                    race: Some(race(&mut rng)),
                    poverty_ratio: Some(rng.random_range(0.0..5.0)),
                    smoking: Some(match rng.random_range(0..3) {
                        0 => SmokingStatus::Never,
                        1 => SmokingStatus::Former,
                        _ => SmokingStatus::Current,
                    }),
                    bmi: Some(rng.random_range(18.0..40.0)),
                    diabetes: Some(conditions[0]),
                    hypertension: Some(conditions[1]),
                    high_cholesterol: Some(conditions[2]),
                    cvd: Some(conditions[3]),
                    chronic_count: Some(count),
                    chronic_category: chronic_category(Some(count)),
                    physical_health_days: Some(days),
                    mental_health_days: Some((days / 2.0).floor()),
                    activity_limitation_days: Some((days / 3.0).floor()),
                    weight: Some(rng.random_range(500.0..5000.0)),
                    ..DerivedFields::default()
                },
            }
        })
        .collect()
}

/// Adults with dietary intakes and a periodontitis case flag
///
/// The case probability increases with sugar intake and age.
#[must_use]
pub fn diet_cohort(n: usize, seed: u64) -> Vec<SubjectRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let age = f64::from(rng.random_range(30..=80_u8));
            let sugar = rng.random_range(20.0..200.0);
            let fiber = rng.random_range(5.0..40.0);
            let logit = -3.0 + 0.012 * sugar + 0.03 * (age - 50.0);
            let case = rng.random_bool(1.0 / (1.0 + (-logit).exp()));
            let sex = if rng.random_bool(0.5) { Sex::Male } else { Sex::Female };
            SubjectRecord {
                raw: RawRecord::new(i as i64 + 1, Cycle::new("F"))
                    .with(RawField::Sugar, sugar)
                    .with(RawField::Fiber, fiber)
                    .with(RawField::VitaminC, rng.random_range(10.0..200.0))
                    .with(RawField::Calcium, rng.random_range(300.0..1500.0))
                    .with(RawField::Energy, rng.random_range(1200.0..3000.0)),
                derived: DerivedFields {
                    perio_case: Some(case),
                    sex: Some(sex),
                    age: Some(age),
                    race: Some(race(&mut rng)),
                    weight: Some(rng.random_range(1000.0..30000.0) / 3.0),
                    ..DerivedFields::default()
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_cohort() {
        assert_eq!(older_men_cohort(20, 7), older_men_cohort(20, 7));
        assert_ne!(diet_cohort(20, 7), diet_cohort(20, 8));
    }
}
