//! Member rating resolver tests: age banding, DOB parsing, and the
//! ACA 3-child rule.

use chrono::NaiveDate;
use ichra_core::census::{EmployeeRecord, FamilyStatus};
use ichra_core::member::{
    age_band, age_from_dob_str, eldest_family_age, parse_dob, rated_members, MemberRole,
};

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

/// Mid-year DOB string for someone of `age` on the reference date.
fn dob(age: u32) -> String {
    format!("{}-06-15", 2025 - age)
}

/// Age bands pool at both ends and are single-year in between.
#[test]
fn age_band_boundaries() {
    assert_eq!(age_band(0), "0-14");
    assert_eq!(age_band(14), "0-14");
    assert_eq!(age_band(15), "15");
    assert_eq!(age_band(40), "40");
    assert_eq!(age_band(63), "63");
    assert_eq!(age_band(64), "64 and over");
    assert_eq!(age_band(90), "64 and over");
}

/// All three census DOB formats parse to the same date.
#[test]
fn dob_formats_parse() {
    let expected = NaiveDate::from_ymd_opt(1990, 3, 15).unwrap();
    assert_eq!(parse_dob("03/15/90", reference()), Some(expected));
    assert_eq!(parse_dob("03/15/1990", reference()), Some(expected));
    assert_eq!(parse_dob("1990-03-15", reference()), Some(expected));
}

/// A two-digit year past the reference year means the prior century.
#[test]
fn two_digit_year_rebased() {
    let parsed = parse_dob("03/15/30", reference());
    assert_eq!(parsed, Some(NaiveDate::from_ymd_opt(1930, 3, 15).unwrap()));
    // '05' stays 2005: it does not pass the reference year.
    let parsed = parse_dob("03/15/05", reference());
    assert_eq!(parsed, Some(NaiveDate::from_ymd_opt(2005, 3, 15).unwrap()));
}

/// Garbage and blank cells resolve to no member, not a panic.
#[test]
fn unparseable_dob_is_none() {
    assert_eq!(parse_dob("not-a-date", reference()), None);
    assert_eq!(parse_dob("", reference()), None);
    assert_eq!(parse_dob("  ", reference()), None);
    assert_eq!(age_from_dob_str(None, reference()), None);
}

/// A DOB after the reference date floors the age at zero.
#[test]
fn future_dob_floors_at_zero() {
    assert_eq!(age_from_dob_str(Some("06/15/2026"), reference()), Some(0));
}

/// Children [25, 20, 19, 17, 15]: the three oldest under 21 are rated
/// plus the 21+ child — age 15 rides free.
#[test]
fn three_child_rule() {
    let mut record = EmployeeRecord {
        age: Some(45),
        family_status: Some(FamilyStatus::EmployeeChildren),
        ..Default::default()
    };
    for (slot, age) in [25u32, 20, 19, 17, 15].iter().enumerate() {
        record.dependent_dobs[slot] = Some(dob(*age));
    }

    let members = rated_members(&record, reference());
    let ages: Vec<u32> = members.iter().map(|m| m.age).collect();
    assert_eq!(ages, vec![45, 20, 19, 17, 25]);
    assert_eq!(members[0].role, MemberRole::Employee);
}

/// Children 21+ are never capped.
#[test]
fn adult_children_uncapped() {
    let mut record = EmployeeRecord {
        age: Some(60),
        family_status: Some(FamilyStatus::EmployeeChildren),
        ..Default::default()
    };
    for (slot, age) in [26u32, 24, 23, 22, 21].iter().enumerate() {
        record.dependent_dobs[slot] = Some(dob(*age));
    }

    let members = rated_members(&record, reference());
    assert_eq!(members.len(), 6, "employee plus all five adult children");
}

/// Spouse DOB is consulted only for ES and F statuses.
#[test]
fn spouse_honors_family_status() {
    let record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::EmployeeOnly),
        spouse_dob: Some(dob(38)),
        ..Default::default()
    };
    assert_eq!(rated_members(&record, reference()).len(), 1);

    let record = EmployeeRecord {
        family_status: Some(FamilyStatus::EmployeeSpouse),
        ..record
    };
    let members = rated_members(&record, reference());
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].role, MemberRole::Spouse);
    assert_eq!(members[1].age, 38);
}

/// An unresolvable employee age drops the employee but keeps rating
/// the rest of the family.
#[test]
fn unresolvable_employee_omitted() {
    let record = EmployeeRecord {
        age: None,
        employee_dob: Some("bogus".to_string()),
        family_status: Some(FamilyStatus::EmployeeSpouse),
        spouse_dob: Some(dob(35)),
        ..Default::default()
    };
    let members = rated_members(&record, reference());
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, MemberRole::Spouse);
}

/// Covered lives counts every child; the rated list caps under-21s.
#[test]
fn covered_lives_broader_than_rated() {
    let mut record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::Family),
        spouse_dob: Some(dob(38)),
        ..Default::default()
    };
    for (slot, age) in [10u32, 8, 5, 3, 2].iter().enumerate() {
        record.dependent_dobs[slot] = Some(dob(*age));
    }

    assert_eq!(record.covered_lives(), 7);
    // Employee + spouse + three oldest under-21 children.
    assert_eq!(rated_members(&record, reference()).len(), 5);
}

/// Eldest-member age spans the whole family with no child cap.
#[test]
fn eldest_family_age_spans_family() {
    let mut record = EmployeeRecord {
        age: Some(40),
        family_status: Some(FamilyStatus::Family),
        spouse_dob: Some(dob(38)),
        ..Default::default()
    };
    for (slot, age) in [10u32, 8, 5, 3, 2].iter().enumerate() {
        record.dependent_dobs[slot] = Some(dob(*age));
    }
    assert_eq!(eldest_family_age(&record, reference()), Some(40));

    // An adult child outranks the employee.
    record.dependent_dobs[0] = Some(dob(44));
    assert_eq!(eldest_family_age(&record, reference()), Some(44));
}
