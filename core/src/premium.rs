//! Premium calculation for a single employee and plan.
//!
//! The plan id's embedded state code selects the rating convention:
//! family-tier states (NY, VT) price one composition-keyed rate, every
//! other state sums per-member age-banded rates.

use crate::{
    census::EmployeeRecord,
    config::EngineConfig,
    error::{RatingError, RatingResult},
    member::{age_band, rated_members, FAMILY_TIER_BAND},
    store::RateRow,
    types::{plan_state, rating_area_label, RatingAreaId},
};
use std::collections::HashMap;

/// In-memory index over a batch of rate rows, keyed by
/// (plan id, rating-area label, age-band label).
pub struct RateIndex {
    rates: HashMap<(String, String, String), f64>,
}

impl RateIndex {
    pub fn from_rows(rows: &[RateRow]) -> Self {
        let rates = rows
            .iter()
            .map(|r| {
                (
                    (r.plan_id.clone(), r.rating_area.clone(), r.age_band.clone()),
                    r.rate,
                )
            })
            .collect();
        Self { rates }
    }

    pub fn rate(&self, plan_id: &str, rating_area: &str, age_band: &str) -> Option<f64> {
        self.rates
            .get(&(
                plan_id.to_string(),
                rating_area.to_string(),
                age_band.to_string(),
            ))
            .copied()
    }
}

/// Total monthly premium for an employee and their rated family members.
///
/// Members whose rate lookup fails contribute zero; the caller is
/// responsible for flagging zero-premium outcomes.
pub fn employee_premium(
    record: &EmployeeRecord,
    plan_id: &str,
    rating_area: RatingAreaId,
    rates: &RateIndex,
    config: &EngineConfig,
) -> RatingResult<f64> {
    let state = plan_state(plan_id).ok_or_else(|| RatingError::InvalidPlanId {
        plan_id: plan_id.to_string(),
    })?;

    if config.is_family_tier_state(state) {
        return Ok(family_tier_premium(record, plan_id, rating_area, rates, config));
    }

    let area = rating_area_label(rating_area);
    let total = rated_members(record, config.reference_date)
        .iter()
        .filter_map(|member| rates.rate(plan_id, &area, &age_band(member.age)))
        .sum();
    Ok(total)
}

/// Family-tier rating: one sentinel-band base rate scaled by the
/// composition multiplier. Absent base rate prices to zero.
fn family_tier_premium(
    record: &EmployeeRecord,
    plan_id: &str,
    rating_area: RatingAreaId,
    rates: &RateIndex,
    config: &EngineConfig,
) -> f64 {
    let area = rating_area_label(rating_area);
    match rates.rate(plan_id, &area, FAMILY_TIER_BAND) {
        Some(base) => base * config.family_tier_multipliers.for_status(record.status()),
        None => 0.0,
    }
}
