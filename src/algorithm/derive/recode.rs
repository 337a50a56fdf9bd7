//! Recodes from survey codes to analysis categories
//!
//! Every function maps out-of-domain codes (refused, don't know, skipped)
//! to `None` instead of guessing.

use crate::models::types::{
    ActivityLevel, AgeGroup, BmiCategory, ChronicCategory, Flossing, PhysicalActivity,
    SmokingStatus,
};

/// Upper bound of the 30-day recall questions
pub const MAX_RECALL_DAYS: f64 = 30.0;

/// Smallest `ALQ130` code that is a refusal or don't-know
const ALCOHOL_SENTINEL: f64 = 777.0;

/// Map a 1 = yes / 2 = no question
#[must_use]
pub const fn yes_no(code: Option<i64>) -> Option<bool> {
    match code {
        Some(1) => Some(true),
        Some(2) => Some(false),
        _ => None,
    }
}

/// Diabetes from `DIQ010`; code 3 is borderline
#[must_use]
pub const fn diabetes(code: Option<i64>, borderline_as_yes: bool) -> Option<bool> {
    match code {
        Some(1) => Some(true),
        Some(2) => Some(false),
        Some(3) => Some(borderline_as_yes),
        _ => None,
    }
}

/// Combine two 1 = yes / 2 = no questions: yes if either, no only if both
#[must_use]
pub fn either_yes(first: Option<i64>, second: Option<i64>) -> Option<bool> {
    match (yes_no(first), yes_no(second)) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Smoking status from `SMQ020` (lifetime) and `SMQ040` (now)
#[must_use]
pub fn smoking(lifetime: Option<i64>, now: Option<i64>) -> Option<SmokingStatus> {
    let lifetime = lifetime.filter(|code| matches!(code, 1 | 2))?;
    match (lifetime, now) {
        (_, Some(1 | 2)) => Some(SmokingStatus::Current),
        (1, Some(3)) => Some(SmokingStatus::Former),
        (2, _) => Some(SmokingStatus::Never),
        _ => None,
    }
}

/// Drinks per day; lifetime non-drinkers drink zero
#[must_use]
pub fn alcohol(ever_drinker: Option<i64>, drinks_per_day: Option<f64>) -> Option<f64> {
    if ever_drinker == Some(2) {
        return Some(0.0);
    }
    drinks_per_day.filter(|v| *v >= 0.0 && *v < ALCOHOL_SENTINEL)
}

/// Work-related activity from `PAQ605` and `PAQ620`
#[must_use]
pub fn physical_activity(
    vigorous_work: Option<i64>,
    moderate_work: Option<i64>,
) -> Option<PhysicalActivity> {
    match (vigorous_work, moderate_work) {
        (Some(1), _) | (_, Some(1)) => Some(PhysicalActivity::Active),
        (None, None) => None,
        _ => Some(PhysicalActivity::Inactive),
    }
}

/// Activity level from vigorous and moderate activity at work or leisure
#[must_use]
pub fn activity_level(vigorous: Option<bool>, moderate: Option<bool>) -> Option<ActivityLevel> {
    match (vigorous, moderate) {
        (Some(true), _) => Some(ActivityLevel::High),
        (Some(false), Some(true)) => Some(ActivityLevel::Moderate),
        (Some(false), Some(false)) => Some(ActivityLevel::Low),
        _ => None,
    }
}

/// Flossing frequency from days per week
#[must_use]
pub fn flossing(days: Option<f64>) -> Option<Flossing> {
    let days = days?;
    if days.fract() != 0.0 {
        return None;
    }
    match days as i64 {
        0 => Some(Flossing::Never),
        1..=3 => Some(Flossing::Infrequent),
        4..=6 => Some(Flossing::Frequent),
        7 => Some(Flossing::Daily),
        _ => None,
    }
}

/// BMI category with cutpoints 18.5, 25 and 30
#[must_use]
pub fn bmi_category(bmi: Option<f64>) -> Option<BmiCategory> {
    let bmi = bmi.filter(|v| *v > 0.0)?;
    Some(if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    })
}

/// Older-adult age group; younger ages have no group
#[must_use]
pub fn age_group(age: Option<f64>) -> Option<AgeGroup> {
    let age = age?;
    if age < 60.0 {
        None
    } else if age < 70.0 {
        Some(AgeGroup::Age60To69)
    } else if age < 80.0 {
        Some(AgeGroup::Age70To79)
    } else {
        Some(AgeGroup::Age80Plus)
    }
}

/// Days out of the past 30; 77, 99 and anything outside 0-30 are missing
#[must_use]
pub fn recall_days(days: Option<f64>) -> Option<f64> {
    days.filter(|d| (0.0..=MAX_RECALL_DAYS).contains(d))
}

/// Income to poverty ratio, capped from above
#[must_use]
pub fn poverty_ratio(ratio: Option<f64>, cap: f64) -> Option<f64> {
    ratio.filter(|r| *r >= 0.0).map(|r| r.min(cap))
}

/// Skip-missing count of true indicators; all missing gives `None`
#[must_use]
pub fn chronic_count(indicators: &[Option<bool>]) -> Option<u8> {
    let observed: Vec<bool> = indicators.iter().filter_map(|v| *v).collect();
    if observed.is_empty() {
        return None;
    }
    Some(observed.into_iter().filter(|v| *v).count() as u8)
}

/// Category of a chronic condition count
#[must_use]
pub const fn chronic_category(count: Option<u8>) -> Option<ChronicCategory> {
    match count {
        Some(0) => Some(ChronicCategory::Zero),
        Some(1) => Some(ChronicCategory::One),
        Some(2) => Some(ChronicCategory::Two),
        Some(_) => Some(ChronicCategory::ThreeOrMore),
        None => None,
    }
}

/// Pooled weight: the two-year weight divided by the number of cycles
#[must_use]
pub fn pooled_weight(weight: Option<f64>, n_cycles: usize) -> Option<f64> {
    if n_cycles == 0 {
        return None;
    }
    weight.filter(|w| *w >= 0.0).map(|w| w / n_cycles as f64)
}
