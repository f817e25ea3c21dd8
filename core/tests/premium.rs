//! Premium engine tests: age-banded summation vs family-tier rating.

use ichra_core::census::{EmployeeRecord, FamilyStatus};
use ichra_core::config::EngineConfig;
use ichra_core::error::RatingError;
use ichra_core::premium::{employee_premium, RateIndex};
use ichra_core::store::RateRow;

fn rate_row(plan_id: &str, age_band: &str, rate: f64) -> RateRow {
    RateRow {
        plan_id: plan_id.to_string(),
        rating_area: "Rating Area 1".to_string(),
        age_band: age_band.to_string(),
        rate,
    }
}

const IL_PLAN: &str = "12345IL6789012";
const NY_PLAN: &str = "36096NY0890001";

/// Age-banded rating sums every rated member's band rate.
#[test]
fn age_banded_family_sum() {
    let index = RateIndex::from_rows(&[
        rate_row(IL_PLAN, "40", 450.0),
        rate_row(IL_PLAN, "38", 430.0),
        rate_row(IL_PLAN, "0-14", 210.0),
    ]);
    let mut record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::Family),
        spouse_dob: Some("1987-06-15".to_string()),
        ..Default::default()
    };
    record.dependent_dobs[0] = Some("2016-06-15".to_string());

    let config = EngineConfig::default();
    let premium = employee_premium(&record, IL_PLAN, 1, &index, &config).unwrap();
    assert!((premium - (450.0 + 430.0 + 210.0)).abs() < 1e-9);
}

/// A member whose band has no rate contributes zero, silently.
#[test]
fn missing_member_rate_contributes_zero() {
    let index = RateIndex::from_rows(&[rate_row(IL_PLAN, "40", 450.0)]);
    let record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::EmployeeSpouse),
        spouse_dob: Some("1987-06-15".to_string()),
        ..Default::default()
    };

    let config = EngineConfig::default();
    let premium = employee_premium(&record, IL_PLAN, 1, &index, &config).unwrap();
    assert!((premium - 450.0).abs() < 1e-9);
}

/// Family-tier states price one base rate times the tier multiplier:
/// $500 base at tier F is exactly $1,425.00.
#[test]
fn family_tier_multiplier() {
    let index = RateIndex::from_rows(&[rate_row(NY_PLAN, "Family-Tier Rates", 500.0)]);
    let config = EngineConfig::default();

    let expected = [
        (FamilyStatus::EmployeeOnly, 500.0),
        (FamilyStatus::EmployeeSpouse, 1000.0),
        (FamilyStatus::EmployeeChildren, 850.0),
        (FamilyStatus::Family, 1425.0),
    ];
    for (status, want) in expected {
        let record = EmployeeRecord {
            age: Some(40),
            family_status: Some(status),
            ..Default::default()
        };
        let premium = employee_premium(&record, NY_PLAN, 1, &index, &config).unwrap();
        assert!(
            (premium - want).abs() < 1e-9,
            "tier {status}: expected {want}, got {premium}"
        );
    }
}

/// A family-tier plan with no sentinel row prices to zero.
#[test]
fn family_tier_missing_base_rate() {
    let index = RateIndex::from_rows(&[]);
    let record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::Family),
        ..Default::default()
    };
    let config = EngineConfig::default();
    let premium = employee_premium(&record, NY_PLAN, 1, &index, &config).unwrap();
    assert_eq!(premium, 0.0);
}

/// The rating convention follows the PLAN's state, not the employee's:
/// an age-banded member list is ignored for a family-tier plan id.
#[test]
fn convention_follows_plan_state() {
    let index = RateIndex::from_rows(&[
        rate_row(NY_PLAN, "Family-Tier Rates", 600.0),
        rate_row(NY_PLAN, "40", 999.0),
    ]);
    let record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::EmployeeOnly),
        ..Default::default()
    };
    let config = EngineConfig::default();
    let premium = employee_premium(&record, NY_PLAN, 1, &index, &config).unwrap();
    assert!((premium - 600.0).abs() < 1e-9);
}

/// A plan id too short to carry a state code is a hard error.
#[test]
fn short_plan_id_rejected() {
    let index = RateIndex::from_rows(&[]);
    let record = EmployeeRecord {
        age: Some(40),
        ..Default::default()
    };
    let config = EngineConfig::default();
    let result = employee_premium(&record, "abc", 1, &index, &config);
    assert!(matches!(result, Err(RatingError::InvalidPlanId { .. })));
}
