//! Scenario aggregator tests: batched lookups, state rollups, and
//! partial-failure behavior, against an in-memory rate store.

use ichra_core::census::{Census, EmployeeRecord, FamilyStatus};
use ichra_core::config::EngineConfig;
use ichra_core::error::{RatingError, RatingResult};
use ichra_core::scenario::{current_totals, projected_renewal_totals, ScenarioCalculator};
use ichra_core::store::{
    LowestRateQuery, LowestRateRow, PlanRow, RateRow, RateSource, RateStore,
};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const IL_GOLD: &str = "12345IL6789012";
const IL_GOLD_CHEAP: &str = "54321IL0000001";
const NY_GOLD: &str = "36096NY0890001";

fn insert_plan(store: &RateStore, plan_id: &str, name: &str, metal: &str) {
    store
        .insert_plan(&PlanRow {
            plan_id: plan_id.to_string(),
            name: name.to_string(),
            metal: metal.to_string(),
            plan_type: Some("HMO".to_string()),
            actuarial_value: None,
        })
        .unwrap();
}

fn il_store() -> RateStore {
    let store = RateStore::in_memory().unwrap();
    store.migrate().unwrap();
    insert_plan(&store, IL_GOLD, "Blue IL Gold HMO", "Gold");
    store.insert_rate(IL_GOLD, "Rating Area 1", "30", 350.0).unwrap();
    store.insert_rate(IL_GOLD, "Rating Area 1", "55", 520.0).unwrap();
    store
}

fn employee(state: &str, age: u32) -> EmployeeRecord {
    EmployeeRecord {
        state: Some(state.to_string()),
        rating_area: Some(1),
        age: Some(age),
        family_status: Some(FamilyStatus::EmployeeOnly),
        ..Default::default()
    }
}

fn il_selection() -> BTreeMap<String, String> {
    BTreeMap::from([("IL".to_string(), IL_GOLD.to_string())])
}

/// Two IL employees at exact age bands: $350 + $520 = $870/mo,
/// $10,440/yr, no errors, everyone counted.
#[test]
fn selected_plan_scenario_end_to_end() {
    let store = il_store();
    let census = Census::new(vec![employee("IL", 30), employee("IL", 55)]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();

    let result = calculator
        .selected_plan_scenario(&census, &il_selection())
        .unwrap();

    assert_eq!(result.employees_covered, 2);
    assert_eq!(result.lives_covered, 2);
    assert!((result.total_monthly - 870.0).abs() < 1e-9);
    assert!((result.total_annual - 10_440.0).abs() < 1e-9);
    assert!(result.errors.is_empty());

    let il = &result.by_state["IL"];
    assert_eq!(il.employees, 2);
    assert!((il.monthly - 870.0).abs() < 1e-9);
    assert_eq!(il.plan_name, "Blue IL Gold HMO");
}

/// An employee with no matching band contributes zero and an error
/// string; the run still completes and counts them.
#[test]
fn missing_rate_degrades_not_aborts() {
    let store = il_store();
    let census = Census::new(vec![employee("IL", 30), employee("IL", 45)]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();

    let result = calculator
        .selected_plan_scenario(&census, &il_selection())
        .unwrap();

    assert_eq!(result.employees_covered, 2);
    assert!((result.total_monthly - 350.0).abs() < 1e-9);
    assert_eq!(
        result.errors,
        vec!["No rate found for employee in IL, RA 1".to_string()]
    );
}

/// A non-empty census with no state values is an explicit error
/// payload, not a panic.
#[test]
fn stateless_census_rejected() {
    let store = il_store();
    let record = EmployeeRecord {
        age: Some(40),
        ..Default::default()
    };
    let census = Census::new(vec![record]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();

    let selected = calculator.selected_plan_scenario(&census, &il_selection());
    assert!(matches!(selected, Err(RatingError::NoStateColumn)));
    let lowest = calculator.lowest_cost_scenario(&census, "Gold");
    assert!(matches!(lowest, Err(RatingError::NoStateColumn)));
}

// Wraps a real store and counts round trips.
struct CountingSource {
    inner: RateStore,
    rate_fetches: Cell<u32>,
    lowest_fetches: Cell<u32>,
}

impl CountingSource {
    fn new(inner: RateStore) -> Self {
        Self {
            inner,
            rate_fetches: Cell::new(0),
            lowest_fetches: Cell::new(0),
        }
    }
}

impl RateSource for CountingSource {
    fn fetch_rates(&self, plan_ids: &BTreeSet<String>) -> RatingResult<Vec<RateRow>> {
        self.rate_fetches.set(self.rate_fetches.get() + 1);
        self.inner.fetch_rates(plan_ids)
    }

    fn fetch_lowest_rates(&self, query: &LowestRateQuery) -> RatingResult<Vec<LowestRateRow>> {
        self.lowest_fetches.set(self.lowest_fetches.get() + 1);
        self.inner.fetch_lowest_rates(query)
    }

    fn fetch_plan_names(
        &self,
        plan_ids: &BTreeSet<String>,
    ) -> RatingResult<HashMap<String, String>> {
        self.inner.fetch_plan_names(plan_ids)
    }

    fn plan_count_for_area(&self, state: &str, rating_area: &str) -> RatingResult<i64> {
        self.inner.plan_count_for_area(state, rating_area)
    }
}

/// Call-count invariant: one rate fetch no matter how many employees
/// share the selection.
#[test]
fn one_rate_fetch_for_any_census_size() {
    let source = CountingSource::new(il_store());
    let census = Census::new((0..25).map(|_| employee("IL", 30)).collect());
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &source).unwrap();

    calculator
        .selected_plan_scenario(&census, &il_selection())
        .unwrap();
    assert_eq!(source.rate_fetches.get(), 1);
}

/// The lowest-cost path also stays at one round trip, even across
/// several metal levels.
#[test]
fn one_lowest_rate_fetch_for_any_census_size() {
    let source = CountingSource::new(il_store());
    let census = Census::new((0..25).map(|i| employee("IL", 30 + (i % 20))).collect());
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &source).unwrap();

    calculator
        .multi_metal_scenario(
            &census,
            &["Bronze".to_string(), "Silver".to_string(), "Gold".to_string()],
        )
        .unwrap();
    assert_eq!(source.lowest_fetches.get(), 1);
}

/// Each employee gets the cheapest plan in their own rating area.
#[test]
fn lowest_cost_picks_cheapest_plan() {
    let store = il_store();
    insert_plan(&store, IL_GOLD_CHEAP, "Value IL Gold EPO", "Gold");
    store
        .insert_rate(IL_GOLD_CHEAP, "Rating Area 1", "30", 300.0)
        .unwrap();

    let census = Census::new(vec![employee("IL", 30)]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Gold").unwrap();

    assert!((scenario.total_monthly - 300.0).abs() < 1e-9);
    let detail = &scenario.employee_details[0];
    assert_eq!(detail.plan_name.as_deref(), Some("Value IL Gold EPO"));
    assert!((detail.ee_rate - 300.0).abs() < 1e-9);
    assert!(scenario.errors.is_empty());
}

/// The employee age falls back to DOB parsing on the lowest-cost path.
#[test]
fn lowest_cost_resolves_age_from_dob() {
    let store = il_store();
    store.insert_rate(IL_GOLD, "Rating Area 1", "29", 250.0).unwrap();

    let record = EmployeeRecord {
        state: Some("IL".to_string()),
        rating_area: Some(1),
        employee_dob: Some("1996-06-15".to_string()),
        family_status: Some(FamilyStatus::EmployeeOnly),
        ..Default::default()
    };
    let census = Census::new(vec![record]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Gold").unwrap();

    assert!((scenario.total_monthly - 250.0).abs() < 1e-9);
}

/// No resolvable age: the row is skipped with a named error.
#[test]
fn lowest_cost_missing_age_recorded() {
    let store = il_store();
    let record = EmployeeRecord {
        employee_id: "E9".to_string(),
        state: Some("IL".to_string()),
        rating_area: Some(1),
        family_status: Some(FamilyStatus::EmployeeOnly),
        ..Default::default()
    };
    let census = Census::new(vec![record]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Gold").unwrap();

    assert_eq!(scenario.employees_covered, 0);
    assert_eq!(scenario.errors, vec!["No age found for employee E9 in IL".to_string()]);
}

/// An unmatched location tuple is a named error; the employee still
/// counts toward headcounts.
#[test]
fn lowest_cost_missing_band_recorded() {
    let store = il_store();
    let census = Census::new(vec![employee("IL", 50)]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Gold").unwrap();

    assert_eq!(scenario.employees_covered, 1);
    assert_eq!(scenario.lives_covered, 1);
    assert_eq!(scenario.total_monthly, 0.0);
    assert_eq!(
        scenario.errors,
        vec!["No Gold rate for IL RA 1, age 50".to_string()]
    );
}

/// Family-tier states key the lowest-cost lookup on the sentinel band
/// and scale by the ESTIMATE multiplier set (1.5 for ES, not 2.0).
#[test]
fn lowest_cost_family_tier_sentinel() {
    let store = RateStore::in_memory().unwrap();
    store.migrate().unwrap();
    insert_plan(&store, NY_GOLD, "Empire NY Gold", "Gold");
    store
        .insert_rate(NY_GOLD, "Rating Area 1", "Family-Tier Rates", 500.0)
        .unwrap();

    let record = EmployeeRecord {
        state: Some("NY".to_string()),
        rating_area: Some(1),
        age: Some(40),
        family_status: Some(FamilyStatus::EmployeeSpouse),
        ..Default::default()
    };
    let census = Census::new(vec![record]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Gold").unwrap();

    assert!((scenario.total_monthly - 750.0).abs() < 1e-9);
    assert_eq!(scenario.lives_covered, 2);
    assert!(scenario.errors.is_empty());
}

/// Expanded Bronze competes inside the Bronze bucket; the cheaper
/// rate wins.
#[test]
fn expanded_bronze_folds_into_bronze() {
    let store = RateStore::in_memory().unwrap();
    store.migrate().unwrap();
    insert_plan(&store, IL_GOLD, "IL Bronze HMO", "Bronze");
    store.insert_rate(IL_GOLD, "Rating Area 1", "30", 310.0).unwrap();
    insert_plan(&store, IL_GOLD_CHEAP, "IL Expanded Bronze EPO", "Expanded Bronze");
    store
        .insert_rate(IL_GOLD_CHEAP, "Rating Area 1", "30", 280.0)
        .unwrap();

    let census = Census::new(vec![employee("IL", 30)]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Bronze").unwrap();

    assert!((scenario.total_monthly - 280.0).abs() < 1e-9);
    assert_eq!(
        scenario.employee_details[0].plan_name.as_deref(),
        Some("IL Expanded Bronze EPO")
    );
}

/// Renewal premiums accumulate alongside the scenario, gap included.
#[test]
fn lowest_cost_carries_renewal_baseline() {
    let store = il_store();
    let mut record = employee("IL", 30);
    record.projected_renewal_monthly = Some(600.0);
    record.gap_insurance_monthly = Some(50.0);
    let census = Census::new(vec![record]);
    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store).unwrap();
    let scenario = calculator.lowest_cost_scenario(&census, "Gold").unwrap();

    assert!((scenario.total_projected_renewal_monthly - 650.0).abs() < 1e-9);
    assert!((scenario.total_projected_renewal_annual - 7_800.0).abs() < 1e-9);
    let detail = &scenario.employee_details[0];
    assert!((detail.current_total_monthly - 50.0).abs() < 1e-9);
}

/// Both baseline calculators share the census-level currency
/// convention and never abort on gaps.
#[test]
fn baseline_totals() {
    let mut a = employee("IL", 30);
    a.current_ee_monthly = Some(100.0);
    a.current_er_monthly = Some(400.0);
    a.gap_insurance_monthly = Some(50.0);
    a.projected_renewal_monthly = Some(600.0);
    let mut b = employee("IL", 55);
    b.current_ee_monthly = Some(200.0);
    b.current_er_monthly = Some(500.0);
    let census = Census::new(vec![a, b]);

    let current = current_totals(&census);
    assert!((current.total_ee_monthly - 300.0).abs() < 1e-9);
    assert!((current.total_er_monthly - 900.0).abs() < 1e-9);
    assert!((current.total_gap_monthly - 50.0).abs() < 1e-9);
    assert!((current.total_premium_monthly - 1250.0).abs() < 1e-9);
    assert!((current.total_premium_annual - 15_000.0).abs() < 1e-9);
    assert_eq!(current.employees_with_data, 2);

    let renewal = projected_renewal_totals(&census);
    assert!(renewal.has_data);
    assert_eq!(renewal.employees_with_data, 1);
    assert!((renewal.total_monthly - 650.0).abs() < 1e-9);
    assert!((renewal.total_annual - 7_800.0).abs() < 1e-9);
}

/// A census with no contribution data yields zeroed baselines.
#[test]
fn baselines_tolerate_missing_columns() {
    let census = Census::new(vec![employee("IL", 30)]);
    let current = current_totals(&census);
    assert_eq!(current.employees_with_data, 0);
    assert_eq!(current.total_premium_monthly, 0.0);
    let renewal = projected_renewal_totals(&census);
    assert!(!renewal.has_data);
}
