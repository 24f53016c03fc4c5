//! # risk_metrics (Aggregation Layer)
//!
//! Turns a simulation ensemble into a [`RiskReport`]: VaR and CVaR from the
//! path-return distribution, drawdown statistics from the trajectories,
//! risk-adjusted ratios, and seeded bootstrap confidence intervals. Every
//! metric handles degenerate inputs (a stress run can legitimately produce
//! an all-equal distribution) by returning a documented sentinel instead of
//! erroring.

pub mod drawdown;
pub mod ratios;
mod report;
pub mod var;

pub use report::{MetricEntry, ReportConfig, RiskAggregator, RiskReport};
