//! Stress-desk demo.
//!
//! Runs the full pipeline on a synthetic two-asset history: regime fit,
//! per-asset GARCH fit, regime-aware Monte Carlo under the standard stress
//! catalog, and a bootstrap-intervalled risk report printed as JSON.

use anyhow::Result;
use chrono::NaiveDate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use risk_core::{Portfolio, ReturnSeries, TradingBounds};
use risk_engine::{SimulationConfig, SimulationEngine};
use risk_metrics::{ReportConfig, RiskAggregator};
use risk_models::{GarchModel, GarchSpec, RegimeClassifier, RegimeConfig};
use risk_scenarios::ScenarioLibrary;

/// Deterministic two-asset history alternating calm and turbulent
/// stretches, stand-in for a real feed.
fn synthetic_history(n: usize) -> Result<ReturnSeries> {
    let start = NaiveDate::from_ymd_opt(2014, 1, 2).expect("valid date");
    let dates: Vec<NaiveDate> = (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    let mut x = 0.3_f64;
    let mut y = 0.7_f64;
    let mut values = Vec::with_capacity(n * 2);
    for t in 0..n {
        x = (x * 997.0 + t as f64 * 0.613).sin();
        y = (y * 613.0 + t as f64 * 0.997).sin();
        let scale = if (t / 120) % 2 == 0 { 0.005 } else { 0.025 };
        values.push(x * scale);
        values.push((0.8 * x + 0.2 * y) * scale);
    }
    Ok(ReturnSeries::new(dates, values, 2)?)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("stress_desk=info".parse()?))
        .init();

    tracing::info!("stress-desk demo starting");

    let history = synthetic_history(1200)?;

    let classifier = RegimeClassifier::new(RegimeConfig {
        n_regimes: 3,
        ..Default::default()
    })?;
    let regime_model = classifier.fit(&history)?;
    let (initial_regime, proba) = regime_model.detect_regime(&history)?;
    tracing::info!(initial_regime, ?proba, "regime detected");

    let spec = GarchSpec::default();
    let vol_models: Vec<GarchModel> = (0..history.n_assets())
        .map(|j| GarchModel::fit(&spec, &history.asset_returns(j)))
        .collect::<Result<_, _>>()?;
    for (j, model) in vol_models.iter().enumerate() {
        tracing::info!(
            asset = j,
            persistence = model.persistence(),
            unconditional_vol = model.unconditional_vol(),
            "volatility model fitted"
        );
    }

    let config = SimulationConfig::builder()
        .n_sims(10_000)
        .horizon(252)
        .master_seed(42)
        .transaction_cost(0.0005)
        .build()?;
    let engine = SimulationEngine::new(
        regime_model,
        vol_models,
        ScenarioLibrary::standard()?,
        config,
    )?;

    let portfolio = Portfolio::new(1_000_000.0, vec![0.6, 0.4])?.with_bounds(TradingBounds {
        stop_loss: Some(0.80),
        take_profit: None,
        max_leverage: Some(2.0),
    })?;

    let result = engine.simulate(&portfolio, initial_regime)?;
    tracing::info!(
        paths = result.paths().len(),
        failed = result.failed_paths(),
        early_termination_rate = result.early_termination_rate(),
        "simulation finished"
    );

    let report = RiskAggregator::new(ReportConfig::default())?.aggregate(&result)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
