use crate::aggregator::TransactionAggregator;
use crate::allocation::AllocationReconciler;
use crate::collaborators::{ForecastRequest, ForecastResponse, Forecaster, InvestmentRequest, Optimizer};
use crate::config::EngineConfig;
use crate::error::{Diagnostic, ReconciliationError, Result, Severity};
use crate::ingestion::{ingest_transactions, UserSnapshot};
use crate::metrics::MetricsSummarizer;
use crate::reconciler::ForecastReconciler;
use crate::savings::SavingsCalculator;
use crate::schema::{
    AggregatedExpenses, AllocationReport, MonthlySavings, ReconciledSeries, SavingsComparison,
    SavingsMetrics, SavingsOverview, WeeklyCategoryTotal,
};
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Runs the savings and investment reconciliation paths for one request at a time.
///
/// Holds no per-request state, so one engine can serve concurrent requests.
#[derive(Clone)]
pub struct ReconciliationEngine {
    config: EngineConfig,
    forecaster: Arc<dyn Forecaster>,
    optimizer: Arc<dyn Optimizer>,
}

impl ReconciliationEngine {
    pub fn new(
        config: EngineConfig,
        forecaster: Arc<dyn Forecaster>,
        optimizer: Arc<dyn Optimizer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            forecaster,
            optimizer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds the savings dashboard for `snapshot` as seen on `reference_date`.
    ///
    /// Malformed records and a missing income abort the request. A failed
    /// forecast call does not: the overview is returned with a history-only
    /// series and a `ForecastUnavailable` diagnostic. A forecast that overlaps
    /// recorded months is dropped with an `OverlappingMonth` diagnostic.
    pub async fn savings_overview(
        &self,
        snapshot: &UserSnapshot,
        reference_date: NaiveDate,
    ) -> Result<SavingsOverview> {
        info!(
            "Building savings overview for {} transactions (reference date {})",
            snapshot.transactions.len(),
            reference_date
        );

        let history = prepare_history(snapshot, &self.config)?;
        let request = ForecastRequest {
            past_savings: history.past_savings.iter().map(|s| s.value).collect(),
            expense_by_category: history.expenses.by_category.clone(),
        };

        let mut diagnostics = Vec::new();
        let forecast = match self.forecaster.forecast(&request).await {
            Ok(response) => response,
            Err(err) => {
                let err = match err {
                    ReconciliationError::ForecastUnavailable(_) => err,
                    other => ReconciliationError::ForecastUnavailable(other.to_string()),
                };
                warn!("Continuing without forecast: {}", err);
                diagnostics.push(err.to_diagnostic(Severity::Error));
                ForecastResponse::default()
            }
        };

        assemble_overview(history, &forecast, reference_date, &self.config, diagnostics)
    }

    /// Requests an allocation for `request` and reconciles it.
    pub async fn investment_plan(&self, request: &InvestmentRequest) -> Result<AllocationReport> {
        if request.amount <= Decimal::ZERO {
            return Err(ReconciliationError::InvalidAmount(request.amount));
        }

        info!(
            "Building investment plan for {} ({:?})",
            request.amount, request.risk_profile
        );

        let response = self.optimizer.optimize(request).await.map_err(|err| match err {
            ReconciliationError::AllocationUnavailable(_) => err,
            other => ReconciliationError::AllocationUnavailable(other.to_string()),
        })?;

        let report =
            AllocationReconciler::new(self.config.allocation_tolerance).reconcile(&response.allocations)?;
        debug!(
            "Reconciled {} allocation classes with {} diagnostics",
            report.breakdown.len(),
            report.diagnostics.len()
        );

        Ok(report)
    }
}

/// Everything derived from the snapshot before the forecast is known.
pub(crate) struct PreparedHistory {
    income: Decimal,
    expenses: AggregatedExpenses,
    weekly_category_totals: Vec<WeeklyCategoryTotal>,
    past_savings: Vec<MonthlySavings>,
    recent_comparison: Vec<SavingsComparison>,
}

pub(crate) fn prepare_history(
    snapshot: &UserSnapshot,
    config: &EngineConfig,
) -> Result<PreparedHistory> {
    let calculator = SavingsCalculator::new(snapshot.income)?;
    let transactions = ingest_transactions(&snapshot.transactions)?;

    let aggregator = TransactionAggregator::new(config.default_category.clone());
    let expenses = aggregator.aggregate(&transactions)?;
    let weekly_category_totals = aggregator.weekly_category_totals(&transactions)?;

    let past_savings = calculator.calculate(&expenses.monthly);
    let recent_comparison = calculator.recent_comparison(&expenses.monthly, config.recent_months);
    debug!(
        "Computed savings for {} months across {} categories",
        past_savings.len(),
        expenses.by_category.len()
    );

    Ok(PreparedHistory {
        income: calculator.income(),
        expenses,
        weekly_category_totals,
        past_savings,
        recent_comparison,
    })
}

/// A forecast that collides with the recorded history, or that cannot be
/// summed, is dropped the same way a failed forecast call is: the overview
/// keeps the history-only series and carries the error as a diagnostic.
pub(crate) fn assemble_overview(
    history: PreparedHistory,
    forecast: &ForecastResponse,
    reference_date: NaiveDate,
    config: &EngineConfig,
    mut diagnostics: Vec<Diagnostic>,
) -> Result<SavingsOverview> {
    let (series, metrics) = match summarize_series(&history, forecast, reference_date, config) {
        Ok(summary) => summary,
        Err(
            err @ (ReconciliationError::OverlappingMonth(_)
            | ReconciliationError::ForecastUnavailable(_)),
        ) if !forecast.forecasted_savings.is_empty() => {
            warn!("Discarding forecast: {}", err);
            diagnostics.push(err.to_diagnostic(Severity::Error));
            summarize_series(&history, &ForecastResponse::default(), reference_date, config)?
        }
        Err(err) => return Err(err),
    };

    Ok(SavingsOverview {
        monthly_expenses: history.expenses.monthly,
        expense_by_category: history.expenses.by_category,
        weekly_category_totals: history.weekly_category_totals,
        past_savings: history.past_savings,
        recent_comparison: history.recent_comparison,
        series,
        metrics,
        diagnostics,
    })
}

fn summarize_series(
    history: &PreparedHistory,
    forecast: &ForecastResponse,
    reference_date: NaiveDate,
    config: &EngineConfig,
) -> Result<(ReconciledSeries, SavingsMetrics)> {
    let series = ForecastReconciler::new(reference_date)
        .reconcile(&history.past_savings, &forecast.forecasted_savings)?;

    let metrics = MetricsSummarizer::new(config.forecast_metric_window).summarize(
        &series,
        history.income,
        &history.expenses.monthly,
        forecast.summary_prompt.as_deref(),
        forecast.advice_prompt.as_deref(),
    )?;

    Ok((series, metrics))
}
