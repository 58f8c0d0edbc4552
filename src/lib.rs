//! # Savings Reconciler
//!
//! Turns a user's raw expense transactions into the two reconciled views a
//! personal-finance dashboard needs.
//!
//! ## Core Concepts
//!
//! - **Aggregation**: transactions are bucketed by calendar month and by category
//! - **Savings**: each recorded month saves `income - expenses`, negative values included
//! - **Forecast reconciliation**: an unlabeled forecast vector from an external model is
//!   labeled with the months following a caller-supplied reference date and merged with
//!   the history into one chronologically ordered series
//! - **Allocation reconciliation**: an optimizer's class → top-asset map is annotated with
//!   percentages, checked for overshoot and projected into tree and flat views
//!
//! The forecasting model and portfolio optimizer are collaborators behind the
//! [`Forecaster`] and [`Optimizer`] traits. HTTP clients for both are available with
//! the `http` feature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use savings_reconciler::*;
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let transactions = vec![
//!     Transaction {
//!         date: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
//!         category: "Rent".to_string(),
//!         amount: dec!(3000),
//!     },
//!     Transaction {
//!         date: NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
//!         category: "Rent".to_string(),
//!         amount: dec!(4500),
//!     },
//! ];
//!
//! let expenses = aggregate_transactions(&transactions)?;
//! let savings = calculate_savings(Some(dec!(5000)), &expenses.monthly)?;
//! let series = reconcile_forecast(
//!     &savings,
//!     &[dec!(100), dec!(-50)],
//!     NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
//! )?;
//! // 2024-11: 2000, 2024-12: 500, 2025-01: 100, 2025-02: -50
//! ```

pub mod aggregator;
pub mod allocation;
pub mod baseline;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod metrics;
pub mod reconciler;
pub mod savings;
pub mod schema;
pub mod utils;

#[cfg(feature = "http")]
pub mod http;

pub use aggregator::{aggregate_transactions, TransactionAggregator};
pub use allocation::{build_hierarchy, flatten_classes, percentage_of, AllocationReconciler};
pub use baseline::MovingAverageForecaster;
pub use collaborators::*;
pub use config::{CollaboratorEndpoints, EngineConfig};
pub use engine::ReconciliationEngine;
pub use error::{Diagnostic, ReasonCode, ReconciliationError, Result, Severity};
pub use ingestion::{ingest_transactions, RawTransaction, UserSnapshot};
pub use metrics::MetricsSummarizer;
pub use reconciler::{reconcile_forecast, ForecastReconciler};
pub use savings::{calculate_savings, SavingsCalculator};
pub use schema::*;
pub use utils::MonthKey;

#[cfg(feature = "http")]
pub use http::{HttpForecaster, HttpOptimizer};

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;

/// Runs the pure part of the savings path on already-fetched inputs.
///
/// Use this when the forecast has been obtained elsewhere; pass an empty
/// `forecast` when the model was unavailable.
pub fn reconcile_savings(
    snapshot: &UserSnapshot,
    forecast: &ForecastResponse,
    reference_date: NaiveDate,
    config: &EngineConfig,
) -> Result<SavingsOverview> {
    config.validate()?;
    info!(
        "Reconciling {} transactions against {} forecast points",
        snapshot.transactions.len(),
        forecast.forecasted_savings.len()
    );

    let history = engine::prepare_history(snapshot, config)?;
    engine::assemble_overview(history, forecast, reference_date, config, Vec::new())
}

/// Reconciles an optimizer response with the default tolerance.
pub fn reconcile_allocation(response: &OptimizerResponse) -> Result<AllocationReport> {
    AllocationReconciler::new(EngineConfig::default().allocation_tolerance)
        .reconcile(&response.allocations)
}

/// Sum of all transaction amounts, the quantity monthly aggregation conserves.
/// `None` if the sum leaves the `Decimal` range.
pub fn total_spent(transactions: &[Transaction]) -> Option<Decimal> {
    utils::checked_sum(transactions.iter().map(|t| t.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_end_to_end_reconciliation() {
        let snapshot = UserSnapshot {
            income: Some(dec!(5000)),
            transactions: vec![
                RawTransaction::new("2024-11-03", "Rent", dec!(2000)),
                RawTransaction::new("2024-11-21", "Utilities", dec!(1000)),
                RawTransaction::new("2024-12-01T09:00:00Z", "Rent", dec!(2000)),
                RawTransaction::new("2024-12-19", "Shopping", dec!(2500)),
            ],
        };
        let forecast = ForecastResponse {
            forecasted_savings: vec![dec!(800), dec!(900)],
            summary_prompt: Some("Savings are recovering.".to_string()),
            advice_prompt: None,
        };

        let overview = reconcile_savings(
            &snapshot,
            &forecast,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            &EngineConfig::default(),
        )
        .unwrap();

        let labels: Vec<String> = overview.series.iter().map(|p| p.month.label()).collect();
        assert_eq!(labels, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
        assert_eq!(overview.metrics.total_income, dec!(10000));
        assert_eq!(overview.metrics.total_expenses, dec!(7500));
        assert_eq!(overview.metrics.net_savings, dec!(2500));
        assert_eq!(overview.metrics.forecast_sum, dec!(1700));
        assert_eq!(overview.metrics.summary, "Savings are recovering.");
        assert_eq!(overview.metrics.advice, "");
        assert_eq!(overview.recent_comparison.len(), 2);
    }

    #[test]
    fn test_forecast_overlapping_history_is_dropped() {
        let snapshot = UserSnapshot {
            income: Some(dec!(5000)),
            transactions: vec![
                RawTransaction::new("2025-02-10", "Rent", dec!(2000)),
                RawTransaction::new("2025-04-01", "Rent", dec!(2100)),
            ],
        };
        let forecast = ForecastResponse {
            forecasted_savings: vec![dec!(800), dec!(900)],
            summary_prompt: Some("Savings are recovering.".to_string()),
            advice_prompt: None,
        };

        let overview = reconcile_savings(
            &snapshot,
            &forecast,
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(overview.diagnostics.len(), 1);
        assert_eq!(overview.diagnostics[0].code, ReasonCode::OverlappingMonth);
        assert_eq!(overview.series.len(), overview.past_savings.len());
        assert_eq!(overview.metrics.forecast_sum, Decimal::ZERO);
        assert_eq!(overview.metrics.summary, "");
        assert_eq!(overview.metrics.net_savings, dec!(5900));
    }

    #[test]
    fn test_invalid_record_aborts_everything() {
        let snapshot = UserSnapshot {
            income: Some(dec!(5000)),
            transactions: vec![RawTransaction::new("2024-13-01", "Rent", dec!(2000))],
        };

        let err = reconcile_savings(
            &snapshot,
            &ForecastResponse::default(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ReasonCode::InvalidRecord);
    }

    #[test]
    fn test_total_spent_matches_aggregation() {
        let transactions = vec![
            Transaction {
                date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                category: "Gas".to_string(),
                amount: dec!(12.34),
            },
            Transaction {
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                category: "Gas".to_string(),
                amount: dec!(0.66),
            },
        ];
        let expenses = aggregate_transactions(&transactions).unwrap();
        assert_eq!(expenses.total_expenses(), total_spent(&transactions));
    }
}
