//! Shared primitive types used across the rating engine.

/// Two-letter USPS state code, uppercase.
pub type StateCode = String;

/// HIOS plan identifier, e.g. `36096NY0890001`.
pub type PlanId = String;

/// Rating-area number within a state (1-based).
pub type RatingAreaId = u32;

/// The label rate tables use for a rating area.
pub fn rating_area_label(area: RatingAreaId) -> String {
    format!("Rating Area {area}")
}

/// Extract the state code embedded in a HIOS plan id
/// (characters 6-7, 1-based).
pub fn plan_state(plan_id: &str) -> Option<&str> {
    plan_id.get(5..7)
}
