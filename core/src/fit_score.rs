//! Employer fit score — six weighted categories rolled into 0–100.
//!
//! Every category degrades to a documented neutral default when its
//! input is absent, and says so: `ScoreBasis` lets callers tell
//! "neutral because computed" from "neutral because the data wasn't
//! there". Weights must sum to exactly 100 before a calculator exists.

use crate::{
    census::{Census, FamilyStatus},
    config::EngineConfig,
    error::RatingResult,
    member::employee_age,
    store::RateSource,
    types::rating_area_label,
};
use serde::Serialize;
use std::collections::BTreeSet;

/// How a category score came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBasis {
    /// Computed from real census/financial data.
    Computed,
    /// The category's required input was absent; this is the neutral
    /// default, not a measurement.
    InsufficientData,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryScore {
    pub score: u32,
    pub basis: ScoreBasis,
}

impl CategoryScore {
    fn computed(score: u32) -> Self {
        Self {
            score,
            basis: ScoreBasis::Computed,
        }
    }

    fn degraded(score: u32) -> Self {
        Self {
            score,
            basis: ScoreBasis::InsufficientData,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FitScoreResult {
    pub overall: u32,
    pub cost_advantage: CategoryScore,
    pub market_readiness: CategoryScore,
    pub workforce_fit: CategoryScore,
    pub geographic_complexity: CategoryScore,
    pub employee_experience: CategoryScore,
    pub admin_readiness: CategoryScore,
}

/// Band an overall score for display.
pub fn fit_label(overall: u32) -> &'static str {
    if overall >= 70 {
        "Strong Fit"
    } else if overall >= 50 {
        "Moderate Fit"
    } else {
        "Needs Review"
    }
}

pub struct FitScoreCalculator<'a> {
    census: &'a Census,
    config: &'a EngineConfig,
    /// Annual cost of the proposed scenario (e.g. a lowest-cost
    /// scenario's `total_annual`). Absent → cost advantage degrades.
    proposed_annual_cost: Option<f64>,
    rates: Option<&'a dyn RateSource>,
}

impl<'a> FitScoreCalculator<'a> {
    pub fn new(census: &'a Census, config: &'a EngineConfig) -> RatingResult<Self> {
        config.fit_score_weights.validate()?;
        Ok(Self {
            census,
            config,
            proposed_annual_cost: None,
            rates: None,
        })
    }

    pub fn with_financial(mut self, proposed_annual_cost: f64) -> Self {
        self.proposed_annual_cost = Some(proposed_annual_cost);
        self
    }

    pub fn with_rate_source(mut self, rates: &'a dyn RateSource) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn calculate(&self) -> FitScoreResult {
        let cost_advantage = self.cost_advantage();
        let market_readiness = self.market_readiness();
        let workforce_fit = self.workforce_fit();
        let geographic_complexity = self.geographic_complexity();
        let employee_experience = self.employee_experience();
        let admin_readiness = self.admin_readiness();

        let weights = &self.config.fit_score_weights;
        let overall = cost_advantage.score as f64 * weights.cost_advantage as f64 / 100.0
            + market_readiness.score as f64 * weights.market_readiness as f64 / 100.0
            + workforce_fit.score as f64 * weights.workforce_fit as f64 / 100.0
            + geographic_complexity.score as f64 * weights.geographic_complexity as f64 / 100.0
            + employee_experience.score as f64 * weights.employee_experience as f64 / 100.0
            + admin_readiness.score as f64 * weights.admin_readiness as f64 / 100.0;
        let overall = overall.round() as u32;

        log::info!(
            "fit score: {overall} ({}) for {} employees",
            fit_label(overall),
            self.census.len(),
        );

        FitScoreResult {
            overall,
            cost_advantage,
            market_readiness,
            workforce_fit,
            geographic_complexity,
            employee_experience,
            admin_readiness,
        }
    }

    /// Savings of the proposed scenario vs the current employer-paid
    /// annual cost, scored on tiered thresholds.
    fn cost_advantage(&self) -> CategoryScore {
        let current_er_annual: f64 = self
            .census
            .records
            .iter()
            .filter_map(|r| r.current_er_monthly)
            .sum::<f64>()
            * 12.0;
        let proposed_annual = self.proposed_annual_cost.unwrap_or(0.0);

        if current_er_annual <= 0.0 || proposed_annual <= 0.0 {
            return CategoryScore::degraded(70);
        }

        let savings_pct = (current_er_annual - proposed_annual) / current_er_annual * 100.0;
        let score = if savings_pct >= 20.0 {
            100
        } else if savings_pct >= 15.0 {
            90
        } else if savings_pct >= 10.0 {
            80
        } else if savings_pct >= 5.0 {
            70
        } else if savings_pct >= 0.0 {
            50
        } else if savings_pct >= -5.0 {
            40
        } else {
            20
        };
        CategoryScore::computed(score)
    }

    /// Marketplace depth at every employee location, scored on the
    /// minimum and average plan count.
    fn market_readiness(&self) -> CategoryScore {
        let Some(rates) = self.rates else {
            return CategoryScore::degraded(75);
        };

        let locations: BTreeSet<(String, u32)> = self
            .census
            .records
            .iter()
            .filter_map(|r| Some((r.state.clone()?, r.rating_area?)))
            .collect();
        if locations.is_empty() {
            return CategoryScore::degraded(75);
        }

        let counts: Vec<i64> = locations
            .iter()
            .map(|(state, area)| {
                match rates.plan_count_for_area(state, &rating_area_label(*area)) {
                    Ok(count) => count,
                    Err(e) => {
                        log::warn!("fit score: plan count lookup failed for {state} RA {area}: {e}");
                        5
                    }
                }
            })
            .collect();

        let min_plans = counts.iter().copied().min().unwrap_or(0);
        let avg_plans = counts.iter().sum::<i64>() as f64 / counts.len() as f64;

        let score = if min_plans >= 15 && avg_plans >= 20.0 {
            100
        } else if min_plans >= 10 && avg_plans >= 15.0 {
            90
        } else if min_plans >= 7 && avg_plans >= 10.0 {
            80
        } else if min_plans >= 5 && avg_plans >= 7.0 {
            70
        } else if min_plans >= 3 {
            60
        } else {
            40
        };
        CategoryScore::computed(score)
    }

    /// Age-distribution skew: younger workforces benefit more from the
    /// individual market, 55+ concentration prices against it.
    fn workforce_fit(&self) -> CategoryScore {
        let ages: Vec<u32> = self
            .census
            .records
            .iter()
            .filter_map(|r| employee_age(r, self.config.reference_date))
            .collect();
        if ages.is_empty() {
            return CategoryScore::degraded(70);
        }

        let total = ages.len() as f64;
        let pct_under_35 = ages.iter().filter(|a| **a < 35).count() as f64 / total * 100.0;
        let pct_under_45 = ages.iter().filter(|a| **a < 45).count() as f64 / total * 100.0;
        let pct_over_55 = ages.iter().filter(|a| **a >= 55).count() as f64 / total * 100.0;

        let mut score: i64 = 50;
        if pct_under_35 >= 40.0 {
            score += 30;
        } else if pct_under_35 >= 25.0 {
            score += 20;
        } else if pct_under_35 >= 15.0 {
            score += 10;
        }
        if pct_under_45 >= 65.0 {
            score += 20;
        } else if pct_under_45 >= 50.0 {
            score += 10;
        }
        if pct_over_55 >= 30.0 {
            score -= 20;
        } else if pct_over_55 >= 20.0 {
            score -= 10;
        }

        CategoryScore::computed(score.clamp(20, 100) as u32)
    }

    /// Fewer states means simpler administration; many rating areas
    /// cost a minor penalty.
    fn geographic_complexity(&self) -> CategoryScore {
        if !self.census.has_state_data() {
            return CategoryScore::degraded(80);
        }

        let states: BTreeSet<&str> = self
            .census
            .records
            .iter()
            .filter_map(|r| r.state.as_deref())
            .collect();
        let rating_areas: BTreeSet<u32> = self
            .census
            .records
            .iter()
            .filter_map(|r| r.rating_area)
            .collect();
        let unique_areas = rating_areas.len().max(1);

        let mut score: i64 = match states.len() {
            1 => 100,
            2..=3 => 90,
            4..=5 => 75,
            6..=10 => 60,
            11..=20 => 45,
            _ => 30,
        };
        if unique_areas > 10 {
            score -= 10;
        } else if unique_areas > 5 {
            score -= 5;
        }

        CategoryScore::computed(score.clamp(20, 100) as u32)
    }

    /// Employee-only rows transition most easily; an older average age
    /// costs a small adjustment.
    fn employee_experience(&self) -> CategoryScore {
        if self.census.is_empty() {
            return CategoryScore::degraded(70);
        }

        let total = self.census.len() as f64;
        let ee_only = self
            .census
            .records
            .iter()
            .filter(|r| r.status() == FamilyStatus::EmployeeOnly)
            .count() as f64;
        let pct_ee_only = ee_only / total * 100.0;

        let mut score: i64 = if pct_ee_only >= 70.0 {
            90
        } else if pct_ee_only >= 55.0 {
            80
        } else if pct_ee_only >= 40.0 {
            70
        } else if pct_ee_only >= 25.0 {
            60
        } else {
            50
        };

        let ages: Vec<u32> = self
            .census
            .records
            .iter()
            .filter_map(|r| employee_age(r, self.config.reference_date))
            .collect();
        if !ages.is_empty() {
            let avg_age = ages.iter().sum::<u32>() as f64 / ages.len() as f64;
            if avg_age < 35.0 {
                score += 10;
            } else if avg_age < 40.0 {
                score += 5;
            } else if avg_age > 50.0 {
                score -= 5;
            }
        }

        CategoryScore::computed(score.clamp(30, 100) as u32)
    }

    /// Census completeness: required fields, contribution data, and
    /// rating-area resolution all add points over a base of 60.
    fn admin_readiness(&self) -> CategoryScore {
        if self.census.is_empty() {
            return CategoryScore::degraded(60);
        }

        let total = self.census.len() as f64;
        let mut score: i64 = 60;

        let state_completeness = self
            .census
            .records
            .iter()
            .filter(|r| r.state.is_some())
            .count() as f64
            / total;
        let status_completeness = self
            .census
            .records
            .iter()
            .filter(|r| r.family_status.is_some())
            .count() as f64
            / total;
        for completeness in [state_completeness, status_completeness] {
            if completeness >= 0.95 {
                score += 8;
            } else if completeness >= 0.8 {
                score += 5;
            }
        }

        let mut has_contribution_data = false;
        let ee_count = self
            .census
            .records
            .iter()
            .filter(|r| r.current_ee_monthly.is_some())
            .count();
        let er_count = self
            .census
            .records
            .iter()
            .filter(|r| r.current_er_monthly.is_some())
            .count();
        for count in [ee_count, er_count] {
            if count > 0 {
                has_contribution_data = true;
                let completeness = count as f64 / total;
                if completeness >= 0.9 {
                    score += 10;
                } else if completeness >= 0.5 {
                    score += 5;
                }
            }
        }
        if has_contribution_data {
            score += 5;
        }

        let resolution_rate = self
            .census
            .records
            .iter()
            .filter(|r| r.rating_area.is_some())
            .count() as f64
            / total;
        if resolution_rate >= 0.95 {
            score += 8;
        } else if resolution_rate >= 0.8 {
            score += 4;
        }

        CategoryScore::computed(score.clamp(30, 100) as u32)
    }
}
