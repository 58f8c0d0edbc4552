use crate::error::{ReconciliationError, Result};
use crate::schema::{MonthlyAggregate, ReconciledSeries, SavingsMetrics};
use crate::utils::checked_sum;
use rust_decimal::Decimal;

pub const DEFAULT_FORECAST_WINDOW: usize = 6;

pub struct MetricsSummarizer {
    forecast_window: usize,
}

impl MetricsSummarizer {
    pub fn new(forecast_window: usize) -> Self {
        Self { forecast_window }
    }

    /// Fails with `MissingIncome` when the income cannot be totalled over the
    /// recorded months, and with `ForecastUnavailable` when the forecast
    /// window does not sum within range.
    pub fn summarize(
        &self,
        series: &ReconciledSeries,
        income: Decimal,
        monthly: &[MonthlyAggregate],
        summary: Option<&str>,
        advice: Option<&str>,
    ) -> Result<SavingsMetrics> {
        let past_months = series.past().count();
        let total_income = income
            .checked_mul(Decimal::from(past_months))
            .ok_or_else(|| {
                ReconciliationError::MissingIncome(format!(
                    "income {} over {} months is out of range",
                    income, past_months
                ))
            })?;

        let total_expenses = checked_sum(monthly.iter().map(|m| m.total_expense)).ok_or_else(|| {
            ReconciliationError::ArithmeticOverflow("monthly expense totals".to_string())
        })?;
        let net_savings = checked_sum(series.past().map(|p| p.value)).ok_or_else(|| {
            ReconciliationError::ArithmeticOverflow("past savings".to_string())
        })?;

        // Series is chronological, so these are the nearest forecast months
        let window: Vec<Decimal> = series
            .forecast()
            .take(self.forecast_window)
            .map(|p| p.value)
            .collect();
        let forecast_sum = checked_sum(window.iter().copied()).ok_or_else(|| {
            ReconciliationError::ForecastUnavailable(format!(
                "the first {} forecast values overflow when summed",
                window.len()
            ))
        })?;

        Ok(SavingsMetrics {
            total_income,
            total_expenses,
            net_savings,
            forecast_sum,
            forecast_points: window.len(),
            summary: summary.unwrap_or_default().to_string(),
            advice: advice.unwrap_or_default().to_string(),
        })
    }
}

impl Default for MetricsSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_FORECAST_WINDOW)
    }
}
