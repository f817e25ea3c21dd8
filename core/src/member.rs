//! Member rating resolver — derives the rated members of one census row.
//!
//! Applies the ACA 3-child rule: only the three oldest children under 21
//! are rated; children 21 and over are always rated individually.

use crate::census::EmployeeRecord;
use chrono::{Datelike, NaiveDate};

/// The age-band label family-tier states use instead of per-age bands.
pub const FAMILY_TIER_BAND: &str = "Family-Tier Rates";

/// Role of a rated member within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Employee,
    Spouse,
    /// Census dependent slot number (2..=6).
    Child(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatedMember {
    pub role: MemberRole,
    pub age: u32,
}

/// Convert an age to the rate-table age-band label.
/// Single-year bands run 15 through 63; 0-14 and 64+ pool.
pub fn age_band(age: u32) -> String {
    if age <= 14 {
        "0-14".to_string()
    } else if age >= 64 {
        "64 and over".to_string()
    } else {
        age.to_string()
    }
}

// DOB formats seen in census files, tried in order.
const DOB_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Parse a DOB cell against the reference date.
///
/// A two-digit year that resolves past the reference year is rebased
/// 100 years earlier ('05' means 1905, not 2005, for anyone alive on
/// the reference date).
pub fn parse_dob(raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    for format in DOB_FORMATS {
        let Ok(dob) = NaiveDate::parse_from_str(s, format) else {
            continue;
        };
        if format == "%m/%d/%y" && dob.year() > reference.year() {
            // Feb 29 can land on a non-leap year after rebasing.
            match dob.with_year(dob.year() - 100) {
                Some(rebased) => return Some(rebased),
                None => continue,
            }
        }
        return Some(dob);
    }
    None
}

/// Age as of the reference date, floored at zero.
pub fn age_from_dob(dob: NaiveDate, reference: NaiveDate) -> u32 {
    ((reference - dob).num_days() / 365).max(0) as u32
}

/// Parse-and-age in one step for optional DOB cells.
pub fn age_from_dob_str(raw: Option<&str>, reference: NaiveDate) -> Option<u32> {
    raw.and_then(|s| parse_dob(s, reference))
        .map(|dob| age_from_dob(dob, reference))
}

/// Resolve the employee's own age: direct value wins, DOB is the
/// fallback. `None` means the row cannot be rated.
pub fn employee_age(record: &EmployeeRecord, reference: NaiveDate) -> Option<u32> {
    record
        .age
        .or_else(|| age_from_dob_str(record.employee_dob.as_deref(), reference))
}

/// Derive the ordered rated-member list for one census row.
///
/// Order: employee, spouse, the three oldest under-21 children
/// (descending age), then all children 21+. Members with unresolvable
/// ages are omitted; the caller reports zero-premium outcomes.
pub fn rated_members(record: &EmployeeRecord, reference: NaiveDate) -> Vec<RatedMember> {
    let mut members = Vec::new();

    if let Some(age) = employee_age(record, reference) {
        members.push(RatedMember {
            role: MemberRole::Employee,
            age,
        });
    }

    if record.status().has_spouse() {
        if let Some(age) = age_from_dob_str(record.spouse_dob.as_deref(), reference) {
            members.push(RatedMember {
                role: MemberRole::Spouse,
                age,
            });
        }
    }

    let mut under_21 = Vec::new();
    let mut adult_children = Vec::new();
    if record.status().has_children() {
        for (i, dob) in record.dependent_dobs.iter().enumerate() {
            let Some(age) = age_from_dob_str(dob.as_deref(), reference) else {
                continue;
            };
            let child = RatedMember {
                role: MemberRole::Child(i as u8 + 2),
                age,
            };
            if age < 21 {
                under_21.push(child);
            } else {
                adult_children.push(child);
            }
        }
    }

    // Three oldest under-21 children are rated; the rest ride free.
    under_21.sort_by(|a, b| b.age.cmp(&a.age));
    under_21.truncate(3);

    members.extend(under_21);
    members.extend(adult_children);
    members
}

/// Age of the oldest family member: employee, spouse (ES/F), and ALL
/// children (EC/F) — group-priced products have no child cap.
pub fn eldest_family_age(record: &EmployeeRecord, reference: NaiveDate) -> Option<u32> {
    let mut eldest = employee_age(record, reference);

    if record.status().has_spouse() {
        if let Some(age) = age_from_dob_str(record.spouse_dob.as_deref(), reference) {
            eldest = Some(eldest.map_or(age, |e| e.max(age)));
        }
    }
    if record.status().has_children() {
        for dob in &record.dependent_dobs {
            if let Some(age) = age_from_dob_str(dob.as_deref(), reference) {
                eldest = Some(eldest.map_or(age, |e| e.max(age)));
            }
        }
    }
    eldest
}
