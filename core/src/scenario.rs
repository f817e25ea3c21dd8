//! Scenario aggregation: workforce premium totals across states.
//!
//! The load-bearing property: every scenario issues a FIXED number of
//! store round trips regardless of census size. Missing data degrades
//! locally — an affected employee contributes zero and an error string,
//! and the run keeps going.

use crate::{
    census::{Census, EmployeeRecord, FamilyStatus},
    config::EngineConfig,
    error::{RatingError, RatingResult},
    member::{age_band, employee_age, rated_members, FAMILY_TIER_BAND},
    premium::{employee_premium, RateIndex},
    store::{LowestRateQuery, LowestRateRow, RateSource},
    types::{rating_area_label, PlanId, RatingAreaId, StateCode},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-state rollup for a selected-plan scenario.
#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub employees: u32,
    pub lives: u32,
    pub monthly: f64,
    pub plan_id: PlanId,
    pub plan_name: String,
}

/// Workforce totals for one plan-per-state selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioResult {
    pub total_monthly: f64,
    pub total_annual: f64,
    pub employees_covered: u32,
    pub lives_covered: u32,
    pub by_state: BTreeMap<StateCode, StateSummary>,
    pub errors: Vec<String>,
}

/// Per-state rollup for a lowest-cost scenario. The plan varies by
/// location, so only a descriptive label is carried.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LowestCostStateSummary {
    pub employees: u32,
    pub lives: u32,
    pub monthly: f64,
    pub plan_name: String,
}

/// Per-employee audit record for the lowest-cost scenarios.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDetail {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub state: StateCode,
    pub rating_area: RatingAreaId,
    pub family_status: FamilyStatus,
    pub age: u32,
    pub age_band: String,
    pub plan_id: Option<PlanId>,
    pub plan_name: Option<String>,
    /// The employee-only rate the estimate is built from.
    pub ee_rate: f64,
    pub tier_multiplier: f64,
    pub estimated_premium: f64,
    pub actuarial_value: Option<f64>,
    pub current_ee_monthly: f64,
    pub current_er_monthly: f64,
    pub gap_insurance_monthly: f64,
    pub current_total_monthly: f64,
    pub projected_renewal_monthly: f64,
}

/// Workforce totals for one metal level's lowest-cost plans.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LowestCostScenario {
    pub metal: String,
    pub total_monthly: f64,
    pub total_annual: f64,
    pub total_projected_renewal_monthly: f64,
    pub total_projected_renewal_annual: f64,
    pub employees_covered: u32,
    pub lives_covered: u32,
    pub by_state: BTreeMap<StateCode, LowestCostStateSummary>,
    pub errors: Vec<String>,
    pub employee_details: Vec<EmployeeDetail>,
    pub average_actuarial_value: Option<f64>,
}

/// Current group-plan baseline from census contribution columns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CurrentTotals {
    pub total_ee_monthly: f64,
    pub total_er_monthly: f64,
    pub total_gap_monthly: f64,
    pub total_premium_monthly: f64,
    pub total_ee_annual: f64,
    pub total_er_annual: f64,
    pub total_gap_annual: f64,
    pub total_premium_annual: f64,
    pub employees_with_data: u32,
}

/// Projected renewal baseline from the census renewal column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenewalTotals {
    pub total_monthly: f64,
    pub total_annual: f64,
    pub total_gap_monthly: f64,
    pub total_gap_annual: f64,
    pub employees_with_data: u32,
    pub has_data: bool,
}

struct WorkItem<'c> {
    record: &'c EmployeeRecord,
    state: StateCode,
    rating_area: RatingAreaId,
    area_label: String,
    age: u32,
    band: String,
}

pub struct ScenarioCalculator<'a> {
    config: &'a EngineConfig,
    rates: &'a dyn RateSource,
}

impl<'a> ScenarioCalculator<'a> {
    pub fn new(config: &'a EngineConfig, rates: &'a dyn RateSource) -> RatingResult<Self> {
        config.validate()?;
        Ok(Self { config, rates })
    }

    /// Total workforce premium for an explicit state → plan selection.
    ///
    /// Issues exactly one rate fetch and one name fetch for the deduped
    /// plan set, then slices the batch per employee.
    pub fn selected_plan_scenario(
        &self,
        census: &Census,
        selections: &BTreeMap<StateCode, PlanId>,
    ) -> RatingResult<ScenarioResult> {
        if !census.is_empty() && !census.has_state_data() {
            return Err(RatingError::NoStateColumn);
        }

        let plan_ids: BTreeSet<PlanId> = selections.values().cloned().collect();
        let index = RateIndex::from_rows(&self.rates.fetch_rates(&plan_ids)?);
        let plan_names = self.rates.fetch_plan_names(&plan_ids)?;

        let mut result = ScenarioResult::default();

        for (state, plan_id) in selections {
            let state_records: Vec<&EmployeeRecord> = census
                .records
                .iter()
                .filter(|r| r.state.as_deref() == Some(state.as_str()))
                .collect();
            if state_records.is_empty() {
                continue;
            }

            let mut monthly = 0.0;
            let mut lives = 0u32;
            for record in &state_records {
                let rating_area = record.rating_area.unwrap_or(1);
                let premium =
                    employee_premium(record, plan_id, rating_area, &index, self.config)?;
                if premium == 0.0 {
                    result
                        .errors
                        .push(format!("No rate found for employee in {state}, RA {rating_area}"));
                }
                monthly += premium;
                lives += rated_members(record, self.config.reference_date).len() as u32;
            }

            result.by_state.insert(
                state.clone(),
                StateSummary {
                    employees: state_records.len() as u32,
                    lives,
                    monthly,
                    plan_id: plan_id.clone(),
                    plan_name: plan_names
                        .get(plan_id)
                        .cloned()
                        .unwrap_or_else(|| "Unknown".to_string()),
                },
            );
            result.total_monthly += monthly;
            result.employees_covered += state_records.len() as u32;
            result.lives_covered += lives;
        }

        result.total_annual = result.total_monthly * 12.0;
        log::info!(
            "scenario: {} employees, ${:.2}/mo across {} states ({} errors)",
            result.employees_covered,
            result.total_monthly,
            result.by_state.len(),
            result.errors.len(),
        );
        Ok(result)
    }

    /// Lowest-cost plan scenario at one metal level, each employee
    /// priced against the cheapest plan in their own rating area.
    pub fn lowest_cost_scenario(
        &self,
        census: &Census,
        metal: &str,
    ) -> RatingResult<LowestCostScenario> {
        let mut results = self.multi_metal_scenario(census, &[metal.to_string()])?;
        Ok(results.remove(metal).unwrap_or_default())
    }

    /// Lowest-cost scenarios for several metal levels in one pass —
    /// one batched store query covers every requested metal.
    pub fn multi_metal_scenario(
        &self,
        census: &Census,
        metals: &[String],
    ) -> RatingResult<BTreeMap<String, LowestCostScenario>> {
        if !census.is_empty() && !census.has_state_data() {
            return Err(RatingError::NoStateColumn);
        }

        let mut results: BTreeMap<String, LowestCostScenario> = metals
            .iter()
            .map(|metal| {
                (
                    metal.clone(),
                    LowestCostScenario {
                        metal: metal.clone(),
                        ..Default::default()
                    },
                )
            })
            .collect();

        // Pre-scan: one work item per ratable employee plus the set of
        // distinct (state, area label, band-or-tier label) keys.
        let mut items: Vec<WorkItem> = Vec::new();
        let mut query = LowestRateQuery {
            metals: metals.to_vec(),
            ..Default::default()
        };
        for record in &census.records {
            let Some(state) = record.state.clone() else {
                continue;
            };
            let rating_area = record.rating_area.unwrap_or(1);
            let Some(age) = employee_age(record, self.config.reference_date) else {
                let msg = format!("No age found for employee {} in {state}", record.employee_id);
                for scenario in results.values_mut() {
                    scenario.errors.push(msg.clone());
                }
                continue;
            };
            let band = if self.config.is_family_tier_state(&state) {
                FAMILY_TIER_BAND.to_string()
            } else {
                age_band(age)
            };
            let area_label = rating_area_label(rating_area);
            query.states.insert(state.clone());
            query.rating_areas.insert(area_label.clone());
            query.age_bands.insert(band.clone());
            items.push(WorkItem {
                record,
                state,
                rating_area,
                area_label,
                age,
                band,
            });
        }

        // One batched round trip for the whole key union, then fold
        // Expanded Bronze into Bronze keeping the cheaper rate.
        let rows = self.rates.fetch_lowest_rates(&query)?;
        let mut lookup: HashMap<(String, String, String), HashMap<String, LowestRateRow>> =
            HashMap::new();
        for row in rows {
            let metal = if row.metal == "Expanded Bronze" {
                "Bronze".to_string()
            } else {
                row.metal.clone()
            };
            let slot = lookup
                .entry((row.state.clone(), row.rating_area.clone(), row.age_band.clone()))
                .or_default();
            match slot.get(&metal) {
                Some(existing) if existing.rate <= row.rate => {}
                _ => {
                    slot.insert(metal, row);
                }
            }
        }

        for item in &items {
            let key = (
                item.state.clone(),
                item.area_label.clone(),
                item.band.clone(),
            );
            let location = lookup.get(&key);
            for metal in metals {
                let Some(scenario) = results.get_mut(metal) else {
                    continue;
                };
                self.apply_work_item(scenario, item, location.and_then(|m| m.get(metal)), metal);
            }
        }

        for (metal, scenario) in results.iter_mut() {
            scenario.total_annual = scenario.total_monthly * 12.0;
            scenario.total_projected_renewal_annual =
                scenario.total_projected_renewal_monthly * 12.0;
            scenario.average_actuarial_value = average_actuarial_value(&lookup, metal);
            log::info!(
                "scenario: lowest-cost {metal} ${:.0}/mo ({} employees, {} errors)",
                scenario.total_monthly,
                scenario.employees_covered,
                scenario.errors.len(),
            );
        }

        Ok(results)
    }

    fn apply_work_item(
        &self,
        scenario: &mut LowestCostScenario,
        item: &WorkItem<'_>,
        row: Option<&LowestRateRow>,
        metal: &str,
    ) {
        let (ee_rate, plan_id, plan_name, actuarial_value) = match row {
            Some(row) => (
                row.rate,
                Some(row.plan_id.clone()),
                Some(row.plan_name.clone()),
                row.actuarial_value,
            ),
            None => {
                scenario.errors.push(format!(
                    "No {metal} rate for {} RA {}, age {}",
                    item.state, item.rating_area, item.band,
                ));
                (0.0, None, None, None)
            }
        };

        let record = item.record;
        let tier_multiplier = self
            .config
            .tier_estimate_multipliers
            .for_status(record.status());
        let estimated_premium = ee_rate * tier_multiplier;
        let lives = self.config.tier_lives.for_status(record.status());

        let current_ee = record.current_ee_monthly.unwrap_or(0.0);
        let current_er = record.current_er_monthly.unwrap_or(0.0);
        let gap = record.gap_insurance_monthly.unwrap_or(0.0);
        // Gap insurance is employer-paid and assumed to continue into
        // the renewal year.
        let projected_renewal = record.projected_renewal_monthly.unwrap_or(0.0) + gap;

        scenario.employee_details.push(EmployeeDetail {
            employee_id: record.employee_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            state: item.state.clone(),
            rating_area: item.rating_area,
            family_status: record.status(),
            age: item.age,
            age_band: item.band.clone(),
            plan_id,
            plan_name,
            ee_rate,
            tier_multiplier,
            estimated_premium,
            actuarial_value,
            current_ee_monthly: current_ee,
            current_er_monthly: current_er,
            gap_insurance_monthly: gap,
            current_total_monthly: current_ee + current_er + gap,
            projected_renewal_monthly: projected_renewal,
        });

        let state_summary = scenario
            .by_state
            .entry(item.state.clone())
            .or_insert_with(|| LowestCostStateSummary {
                plan_name: format!("Lowest Cost {metal} (varies by location)"),
                ..Default::default()
            });
        state_summary.employees += 1;
        state_summary.lives += lives;
        state_summary.monthly += estimated_premium;

        scenario.total_monthly += estimated_premium;
        scenario.total_projected_renewal_monthly += projected_renewal;
        scenario.employees_covered += 1;
        scenario.lives_covered += lives;
    }
}

/// Average actuarial value across the distinct winning plans for one
/// metal, one decimal place. Falls back to the standard AV when the
/// store carries none.
fn average_actuarial_value(
    lookup: &HashMap<(String, String, String), HashMap<String, LowestRateRow>>,
    metal: &str,
) -> Option<f64> {
    let values: Vec<f64> = lookup
        .values()
        .filter_map(|slot| slot.get(metal))
        .filter_map(|row| row.actuarial_value)
        .collect();
    if values.is_empty() {
        return match metal {
            "Bronze" => Some(60.0),
            "Silver" => Some(70.0),
            "Gold" => Some(80.0),
            _ => None,
        };
    }
    Some((values.iter().sum::<f64>() / values.len() as f64 * 10.0).round() / 10.0)
}

/// Current group-plan totals from the census contribution columns.
/// Gap insurance is employer-paid and counts toward the total premium.
pub fn current_totals(census: &Census) -> CurrentTotals {
    let mut totals = CurrentTotals::default();
    let has_columns = census
        .records
        .iter()
        .any(|r| r.current_ee_monthly.is_some() || r.current_er_monthly.is_some());
    if !has_columns {
        return totals;
    }

    for record in &census.records {
        let ee = record.current_ee_monthly.unwrap_or(0.0);
        let er = record.current_er_monthly.unwrap_or(0.0);
        totals.total_ee_monthly += ee;
        totals.total_er_monthly += er;
        totals.total_gap_monthly += record.gap_insurance_monthly.unwrap_or(0.0);
        if ee > 0.0 || er > 0.0 {
            totals.employees_with_data += 1;
        }
    }

    totals.total_premium_monthly =
        totals.total_ee_monthly + totals.total_er_monthly + totals.total_gap_monthly;
    totals.total_ee_annual = totals.total_ee_monthly * 12.0;
    totals.total_er_annual = totals.total_er_monthly * 12.0;
    totals.total_gap_annual = totals.total_gap_monthly * 12.0;
    totals.total_premium_annual = totals.total_premium_monthly * 12.0;
    totals
}

/// Projected renewal totals from the census renewal-premium column.
pub fn projected_renewal_totals(census: &Census) -> RenewalTotals {
    let mut totals = RenewalTotals::default();
    let has_column = census
        .records
        .iter()
        .any(|r| r.projected_renewal_monthly.is_some());
    if !has_column {
        return totals;
    }

    for record in &census.records {
        let renewal = record.projected_renewal_monthly.unwrap_or(0.0);
        totals.total_monthly += renewal;
        totals.total_gap_monthly += record.gap_insurance_monthly.unwrap_or(0.0);
        if renewal > 0.0 {
            totals.employees_with_data += 1;
        }
    }

    // Gap continues into the renewal year.
    totals.total_monthly += totals.total_gap_monthly;
    totals.total_annual = totals.total_monthly * 12.0;
    totals.total_gap_annual = totals.total_gap_monthly * 12.0;
    totals.has_data = totals.employees_with_data > 0;
    totals
}
