//! SQLite rate store.
//!
//! RULE: Only this module talks to the database.
//! Calculators go through the `RateSource` trait — they never execute
//! SQL. Batched IN-list queries keep the round-trip count independent
//! of census size.

use crate::{
    error::{RatingError, RatingResult},
    types::{plan_state, PlanId, StateCode},
};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeSet, HashMap};

/// One age-banded (or family-tier sentinel) rate row.
#[derive(Debug, Clone)]
pub struct RateRow {
    pub plan_id: PlanId,
    pub rating_area: String,
    pub age_band: String,
    pub rate: f64,
}

/// The cheapest plan for one (state, rating area, age band, metal) tuple.
#[derive(Debug, Clone)]
pub struct LowestRateRow {
    pub state: StateCode,
    pub rating_area: String,
    pub age_band: String,
    pub metal: String,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub rate: f64,
    pub actuarial_value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PlanRow {
    pub plan_id: PlanId,
    pub name: String,
    pub metal: String,
    pub plan_type: Option<String>,
    pub actuarial_value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CooperativeRateRow {
    pub age_band: String,
    pub family_status: String,
    pub deductible_1k: Option<f64>,
    pub deductible_2_5k: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SederaRateRow {
    pub iua: String,
    pub age_band: String,
    pub family_status: String,
    pub monthly_rate: Option<f64>,
}

/// Materialized key sets for one batched lowest-rate fetch.
#[derive(Debug, Clone, Default)]
pub struct LowestRateQuery {
    pub states: BTreeSet<String>,
    pub rating_areas: BTreeSet<String>,
    pub age_bands: BTreeSet<String>,
    pub metals: Vec<String>,
}

/// Expand a requested metal list for querying: asking for Bronze also
/// matches Expanded Bronze.
pub fn expand_metals(metals: &[String]) -> Vec<String> {
    let mut expanded = metals.to_vec();
    if metals.iter().any(|m| m == "Bronze") && !expanded.iter().any(|m| m == "Expanded Bronze") {
        expanded.push("Expanded Bronze".to_string());
    }
    expanded
}

/// The seam the calculators are written against.
///
/// A location with no available plans yields empty results, never an
/// error; only connection-level failures propagate.
pub trait RateSource {
    /// All rate rows for a set of plans, one round trip.
    fn fetch_rates(&self, plan_ids: &BTreeSet<PlanId>) -> RatingResult<Vec<RateRow>>;

    /// The cheapest plan per (state, area, band, metal) tuple across the
    /// materialized key sets, one round trip.
    fn fetch_lowest_rates(&self, query: &LowestRateQuery) -> RatingResult<Vec<LowestRateRow>>;

    /// Marketing names for a set of plans.
    fn fetch_plan_names(&self, plan_ids: &BTreeSet<PlanId>)
        -> RatingResult<HashMap<PlanId, String>>;

    /// Number of marketplace plans rated in one (state, rating area).
    fn plan_count_for_area(&self, state: &str, rating_area: &str) -> RatingResult<i64>;

    fn fetch_cooperative_rates(&self) -> RatingResult<Vec<CooperativeRateRow>> {
        Ok(Vec::new())
    }

    fn fetch_sedera_rates(&self, _iua: &str) -> RatingResult<Vec<SederaRateRow>> {
        Ok(Vec::new())
    }
}

pub struct RateStore {
    conn: Connection,
}

impl RateStore {
    pub fn open(path: &str) -> RatingResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only helps real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RatingResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> RatingResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_rates.sql"))?;
        Ok(())
    }

    // ── Loaders (seeding pipelines and tests) ──────────────────

    pub fn insert_plan(&self, plan: &PlanRow) -> RatingResult<()> {
        let state = plan_state(&plan.plan_id).ok_or_else(|| RatingError::InvalidPlanId {
            plan_id: plan.plan_id.clone(),
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO plan (plan_id, name, state, metal, plan_type, actuarial_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                plan.plan_id,
                plan.name,
                state,
                plan.metal,
                plan.plan_type,
                plan.actuarial_value,
            ],
        )?;
        Ok(())
    }

    pub fn insert_rate(
        &self,
        plan_id: &str,
        rating_area: &str,
        age_band: &str,
        rate: f64,
    ) -> RatingResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO plan_rate (plan_id, rating_area, age_band, rate)
             VALUES (?1, ?2, ?3, ?4)",
            params![plan_id, rating_area, age_band, rate],
        )?;
        Ok(())
    }

    pub fn insert_cooperative_rate(&self, row: &CooperativeRateRow) -> RatingResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cooperative_rate
                 (age_band, family_status, deductible_1k, deductible_2_5k)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.age_band,
                row.family_status,
                row.deductible_1k,
                row.deductible_2_5k,
            ],
        )?;
        Ok(())
    }

    pub fn insert_sedera_rate(&self, plan: &str, row: &SederaRateRow) -> RatingResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sedera_rate
                 (plan, iua, age_band, family_status, monthly_rate)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![plan, row.iua, row.age_band, row.family_status, row.monthly_rate],
        )?;
        Ok(())
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl RateSource for RateStore {
    fn fetch_rates(&self, plan_ids: &BTreeSet<PlanId>) -> RatingResult<Vec<RateRow>> {
        if plan_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT plan_id, rating_area, age_band, rate
             FROM plan_rate WHERE plan_id IN ({})",
            placeholders(plan_ids.len()),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(plan_ids.iter()), |row| {
                Ok(RateRow {
                    plan_id: row.get(0)?,
                    rating_area: row.get(1)?,
                    age_band: row.get(2)?,
                    rate: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("store: fetched {} rate rows for {} plans", rows.len(), plan_ids.len());
        Ok(rows)
    }

    fn fetch_lowest_rates(&self, query: &LowestRateQuery) -> RatingResult<Vec<LowestRateRow>> {
        if query.states.is_empty()
            || query.rating_areas.is_empty()
            || query.age_bands.is_empty()
            || query.metals.is_empty()
        {
            return Ok(Vec::new());
        }
        let metals = expand_metals(&query.metals);
        // Bare columns ride along with MIN(): SQLite resolves them from
        // the row that supplied the minimum rate.
        let sql = format!(
            "SELECT p.state, r.rating_area, r.age_band, p.metal,
                    p.plan_id, p.name, MIN(r.rate) AS rate, p.actuarial_value
             FROM plan p
             JOIN plan_rate r ON r.plan_id = p.plan_id
             WHERE p.market = 'Individual'
               AND p.metal != 'Catastrophic'
               AND p.state IN ({})
               AND r.rating_area IN ({})
               AND r.age_band IN ({})
               AND p.metal IN ({})
             GROUP BY p.state, r.rating_area, r.age_band, p.metal",
            placeholders(query.states.len()),
            placeholders(query.rating_areas.len()),
            placeholders(query.age_bands.len()),
            placeholders(metals.len()),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let bound = query
            .states
            .iter()
            .chain(query.rating_areas.iter())
            .chain(query.age_bands.iter())
            .chain(metals.iter());
        let rows = stmt
            .query_map(params_from_iter(bound), |row| {
                Ok(LowestRateRow {
                    state: row.get(0)?,
                    rating_area: row.get(1)?,
                    age_band: row.get(2)?,
                    metal: row.get(3)?,
                    plan_id: row.get(4)?,
                    plan_name: row.get(5)?,
                    rate: row.get(6)?,
                    actuarial_value: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "store: lowest-rate query returned {} rows for {} locations",
            rows.len(),
            query.states.len() * query.rating_areas.len(),
        );
        Ok(rows)
    }

    fn fetch_plan_names(
        &self,
        plan_ids: &BTreeSet<PlanId>,
    ) -> RatingResult<HashMap<PlanId, String>> {
        if plan_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT plan_id, name FROM plan WHERE plan_id IN ({})",
            placeholders(plan_ids.len()),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map(params_from_iter(plan_ids.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(names)
    }

    fn plan_count_for_area(&self, state: &str, rating_area: &str) -> RatingResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT p.plan_id)
             FROM plan p
             JOIN plan_rate r ON r.plan_id = p.plan_id
             WHERE p.state = ?1
               AND r.rating_area = ?2
               AND p.market = 'Individual'
               AND p.metal != 'Catastrophic'",
            params![state, rating_area],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn fetch_cooperative_rates(&self) -> RatingResult<Vec<CooperativeRateRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT age_band, family_status, deductible_1k, deductible_2_5k
             FROM cooperative_rate",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CooperativeRateRow {
                    age_band: row.get(0)?,
                    family_status: row.get(1)?,
                    deductible_1k: row.get(2)?,
                    deductible_2_5k: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_sedera_rates(&self, iua: &str) -> RatingResult<Vec<SederaRateRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT iua, age_band, family_status, monthly_rate
             FROM sedera_rate WHERE iua = ?1",
        )?;
        let rows = stmt
            .query_map(params![iua], |row| {
                Ok(SederaRateRow {
                    iua: row.get(0)?,
                    age_band: row.get(1)?,
                    family_status: row.get(2)?,
                    monthly_rate: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
