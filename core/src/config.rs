//! Engine configuration: rating conventions, tier multipliers, and
//! fit-score weights.
//!
//! Ships with working defaults; deployments override by deserializing
//! a JSON document over the whole struct. `validate()` must pass before
//! any calculator is built.

use crate::census::FamilyStatus;
use crate::error::{RatingError, RatingResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A per-family-status multiplier set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierMultipliers {
    pub ee: f64,
    pub es: f64,
    pub ec: f64,
    pub f: f64,
}

impl TierMultipliers {
    pub fn for_status(&self, status: FamilyStatus) -> f64 {
        match status {
            FamilyStatus::EmployeeOnly => self.ee,
            FamilyStatus::EmployeeSpouse => self.es,
            FamilyStatus::EmployeeChildren => self.ec,
            FamilyStatus::Family => self.f,
        }
    }
}

/// Covered-lives estimate per family status, used by the lowest-cost
/// scenarios where dependents are not rated individually.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierLives {
    pub ee: u32,
    pub es: u32,
    pub ec: u32,
    pub f: u32,
}

impl TierLives {
    pub fn for_status(&self, status: FamilyStatus) -> u32 {
        match status {
            FamilyStatus::EmployeeOnly => self.ee,
            FamilyStatus::EmployeeSpouse => self.es,
            FamilyStatus::EmployeeChildren => self.ec,
            FamilyStatus::Family => self.f,
        }
    }
}

/// Fit-score category weights. Must sum to exactly 100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FitScoreWeights {
    pub cost_advantage: u32,
    pub market_readiness: u32,
    pub workforce_fit: u32,
    pub geographic_complexity: u32,
    pub employee_experience: u32,
    pub admin_readiness: u32,
}

impl FitScoreWeights {
    pub fn sum(&self) -> u32 {
        self.cost_advantage
            + self.market_readiness
            + self.workforce_fit
            + self.geographic_complexity
            + self.employee_experience
            + self.admin_readiness
    }

    pub fn validate(&self) -> RatingResult<()> {
        let sum = self.sum();
        if sum != 100 {
            return Err(RatingError::InvalidWeights { sum });
        }
        Ok(())
    }
}

impl Default for FitScoreWeights {
    fn default() -> Self {
        Self {
            cost_advantage: 25,
            market_readiness: 20,
            workforce_fit: 20,
            geographic_complexity: 15,
            employee_experience: 10,
            admin_readiness: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// States that price a whole family composition as one unit
    /// instead of summing per-member age-banded rates.
    pub family_tier_states: Vec<String>,
    /// Multipliers applied to the family-tier base rate when rating an
    /// actual plan in a family-tier state. Empirical, not regulatory.
    pub family_tier_multipliers: TierMultipliers,
    /// Multipliers used to ESTIMATE family cost from a single
    /// employee-only rate in the lowest-cost scenarios. A separate set
    /// from `family_tier_multipliers` on purpose; the two are
    /// configured independently.
    pub tier_estimate_multipliers: TierMultipliers,
    pub tier_lives: TierLives,
    /// Ages are computed as of this date.
    pub reference_date: NaiveDate,
    pub fit_score_weights: FitScoreWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            family_tier_states: vec!["NY".into(), "VT".into()],
            family_tier_multipliers: TierMultipliers {
                ee: 1.0,
                es: 2.0,
                ec: 1.7,
                f: 2.85,
            },
            tier_estimate_multipliers: TierMultipliers {
                ee: 1.0,
                es: 1.5,
                ec: 1.3,
                f: 1.8,
            },
            tier_lives: TierLives {
                ee: 1,
                es: 2,
                ec: 2,
                f: 3,
            },
            reference_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid reference date"),
            fit_score_weights: FitScoreWeights::default(),
        }
    }
}

impl EngineConfig {
    pub fn is_family_tier_state(&self, state: &str) -> bool {
        self.family_tier_states.iter().any(|s| s == state)
    }

    pub fn validate(&self) -> RatingResult<()> {
        self.fit_score_weights.validate()
    }
}
