//! Cooperative (HAS) and health-share (Sedera) comparisons.
//!
//! These products use GROUP PRICING: a family pays ONE rate keyed by
//! the eldest member's age band and the family status. No per-member
//! summing, and no 3-child cap — every child counts toward "eldest".

use crate::{
    census::{Census, EmployeeRecord, FamilyStatus},
    error::RatingResult,
    member::eldest_family_age,
    store::{CooperativeRateRow, RateSource, SederaRateRow},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Cooperative rate-table age band. Coarser than marketplace bands.
pub fn cooperative_age_band(age: u32) -> &'static str {
    if age < 30 {
        "18-29"
    } else if age < 40 {
        "30-39"
    } else if age < 50 {
        "40-49"
    } else if age < 60 {
        "50-59"
    } else {
        "60-64"
    }
}

/// Sedera age band: same breaks, but the top band is open-ended.
pub fn sedera_age_band(age: u32) -> &'static str {
    if age < 60 {
        cooperative_age_band(age)
    } else {
        "60+"
    }
}

/// Which cooperative deductible column to price against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooperativeDeductible {
    OneThousand,
    TwentyFiveHundred,
}

impl CooperativeDeductible {
    fn rate_of(self, row: &CooperativeRateRow) -> Option<f64> {
        match self {
            CooperativeDeductible::OneThousand => row.deductible_1k,
            CooperativeDeductible::TwentyFiveHundred => row.deductible_2_5k,
        }
    }
}

/// (age band, family status) → monthly group rate.
pub struct GroupRateTable {
    rates: HashMap<(String, FamilyStatus), f64>,
}

impl GroupRateTable {
    pub fn from_cooperative_rows(
        rows: &[CooperativeRateRow],
        deductible: CooperativeDeductible,
    ) -> Self {
        let rates = rows
            .iter()
            .map(|row| {
                (
                    (row.age_band.clone(), FamilyStatus::from_code(&row.family_status)),
                    deductible.rate_of(row).unwrap_or(0.0),
                )
            })
            .collect();
        Self { rates }
    }

    pub fn from_sedera_rows(rows: &[SederaRateRow]) -> Self {
        let rates = rows
            .iter()
            .map(|row| {
                (
                    (row.age_band.clone(), FamilyStatus::from_code(&row.family_status)),
                    row.monthly_rate.unwrap_or(0.0),
                )
            })
            .collect();
        Self { rates }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Missing lookups price to zero, matching the marketplace
    /// missing-rate convention.
    pub fn rate(&self, age_band: &str, status: FamilyStatus) -> f64 {
        self.rates
            .get(&(age_band.to_string(), status))
            .copied()
            .unwrap_or(0.0)
    }
}

/// The single group rate for one census row: eldest member's band plus
/// the row's family status.
pub fn family_group_rate(
    record: &EmployeeRecord,
    reference: NaiveDate,
    table: &GroupRateTable,
    band_of: fn(u32) -> &'static str,
) -> f64 {
    let eldest = eldest_family_age(record, reference).unwrap_or(0);
    table.rate(band_of(eldest), record.status())
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TierBreakdown {
    pub total: f64,
    pub count: u32,
}

/// Youngest-band vs oldest-band rate for one family status.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RateRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupScenario {
    pub total_monthly: f64,
    pub by_tier: BTreeMap<FamilyStatus, TierBreakdown>,
    pub rate_ranges: BTreeMap<FamilyStatus, RateRange>,
}

fn group_scenario(
    census: &Census,
    reference: NaiveDate,
    table: &GroupRateTable,
    oldest_band: &str,
    band_of: fn(u32) -> &'static str,
) -> GroupScenario {
    let mut scenario = GroupScenario::default();
    for status in FamilyStatus::ALL {
        scenario.by_tier.insert(status, TierBreakdown::default());
        scenario.rate_ranges.insert(
            status,
            RateRange {
                min: table.rate("18-29", status),
                max: table.rate(oldest_band, status),
            },
        );
    }

    for record in &census.records {
        let rate = family_group_rate(record, reference, table, band_of);
        scenario.total_monthly += rate;
        if let Some(tier) = scenario.by_tier.get_mut(&record.status()) {
            tier.total += rate;
            tier.count += 1;
        }
    }
    scenario
}

/// Workforce totals on the cooperative's group rates at one deductible.
pub fn cooperative_totals(
    census: &Census,
    deductible: CooperativeDeductible,
    source: &dyn RateSource,
    reference: NaiveDate,
) -> RatingResult<GroupScenario> {
    let rows = source.fetch_cooperative_rates()?;
    let table = GroupRateTable::from_cooperative_rows(&rows, deductible);
    if table.is_empty() {
        return Ok(GroupScenario::default());
    }
    Ok(group_scenario(census, reference, &table, "60-64", cooperative_age_band))
}

/// Workforce totals on Sedera's group rates, one scenario per selected
/// IUA level, keyed `sedera_{iua}`.
pub fn sedera_totals(
    census: &Census,
    iuas: &[String],
    source: &dyn RateSource,
    reference: NaiveDate,
) -> RatingResult<BTreeMap<String, GroupScenario>> {
    let mut result = BTreeMap::new();
    for iua in iuas {
        let rows = source.fetch_sedera_rates(iua)?;
        let table = GroupRateTable::from_sedera_rows(&rows);
        let scenario = if table.is_empty() {
            GroupScenario::default()
        } else {
            group_scenario(census, reference, &table, "60+", sedera_age_band)
        };
        result.insert(format!("sedera_{iua}"), scenario);
    }
    Ok(result)
}
