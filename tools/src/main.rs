//! rate-runner: headless ICHRA scenario runner.
//!
//! Usage:
//!   rate-runner --census census.csv --db rates.db
//!   rate-runner --census census.csv --db rates.db --metals Bronze,Silver,Gold --iuas 1000,2500

use anyhow::Result;
use ichra_core::{
    census::Census,
    config::EngineConfig,
    cooperative::{cooperative_totals, sedera_totals, CooperativeDeductible},
    fit_score::{fit_label, FitScoreCalculator},
    scenario::{current_totals, projected_renewal_totals, ScenarioCalculator},
    store::RateStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let census_path = parse_arg(&args, "--census", "census.csv");
    let db = parse_arg(&args, "--db", "rates.db");
    let metals: Vec<String> = parse_arg(&args, "--metals", "Bronze,Silver,Gold")
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let iuas: Vec<String> = parse_arg(&args, "--iuas", "")
        .split(',')
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    let deductible = match parse_arg(&args, "--deductible", "2.5k") {
        "1k" => CooperativeDeductible::OneThousand,
        _ => CooperativeDeductible::TwentyFiveHundred,
    };

    log::info!("rate-runner: census={census_path} db={db} metals={metals:?}");

    let census = Census::from_csv_path(census_path)?;
    let store = RateStore::open(db)?;
    store.migrate()?;

    let config = EngineConfig::default();
    let calculator = ScenarioCalculator::new(&config, &store)?;
    let scenarios = calculator.multi_metal_scenario(&census, &metals)?;
    let current = current_totals(&census);
    let renewal = projected_renewal_totals(&census);
    let cooperative = cooperative_totals(&census, deductible, &store, config.reference_date)?;
    let sedera = sedera_totals(&census, &iuas, &store, config.reference_date)?;

    // Fit score anchored to the first requested metal's annual cost.
    let mut fit = FitScoreCalculator::new(&census, &config)?.with_rate_source(&store);
    if let Some(primary) = metals.first().and_then(|m| scenarios.get(m)) {
        if primary.total_monthly > 0.0 {
            fit = fit.with_financial(primary.total_annual);
        }
    }
    let fit_score = fit.calculate();

    let report = serde_json::json!({
        "employees": census.len(),
        "lives": census.total_lives(),
        "states": census.states_by_employee_count(),
        "current": current,
        "renewal": renewal,
        "scenarios": scenarios,
        "cooperative": cooperative,
        "sedera": sedera,
        "fit_score": fit_score,
        "fit_label": fit_label(fit_score.overall),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn parse_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
