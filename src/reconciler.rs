use crate::error::{ReconciliationError, Result};
use crate::schema::{MonthlySavings, PointKind, ReconciledSeries, SavingsPoint};
use crate::utils::MonthKey;
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Merges labeled history with an unlabeled forecast vector.
///
/// Forecast value `i` (1-indexed) belongs to the reference month plus `i`
/// months. The reference date is supplied by the caller so that labeling is
/// deterministic.
pub struct ForecastReconciler {
    reference_month: MonthKey,
}

impl ForecastReconciler {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self::for_month(MonthKey::from_date(reference_date))
    }

    /// Labels forecasts from an already-resolved reference month.
    pub fn for_month(reference_month: MonthKey) -> Self {
        Self { reference_month }
    }

    /// Month labels for a forecast of `len` values.
    pub fn forecast_months(&self, len: usize) -> impl Iterator<Item = MonthKey> + '_ {
        (1..=len as i32).map(move |i| self.reference_month.add_months(i))
    }

    pub fn reconcile(
        &self,
        history: &[MonthlySavings],
        forecast: &[Decimal],
    ) -> Result<ReconciledSeries> {
        let mut points: BTreeMap<MonthKey, SavingsPoint> = BTreeMap::new();

        for past in history {
            let previous = points.insert(
                past.month,
                SavingsPoint {
                    month: past.month,
                    kind: PointKind::Past,
                    value: past.value,
                },
            );
            if previous.is_some() {
                return Err(ReconciliationError::OverlappingMonth(past.month));
            }
        }

        if !forecast.is_empty() {
            // Forecast points must all follow the history
            let first_forecast = self.reference_month.next();
            if let Some(latest) = points.keys().next_back() {
                if *latest >= first_forecast {
                    return Err(ReconciliationError::OverlappingMonth(*latest));
                }
            }
        }

        for (month, value) in self.forecast_months(forecast.len()).zip(forecast) {
            points.insert(
                month,
                SavingsPoint {
                    month,
                    kind: PointKind::Forecast,
                    value: *value,
                },
            );
        }

        debug!(
            "Reconciled {} past and {} forecast points (reference month {})",
            history.len(),
            forecast.len(),
            self.reference_month
        );

        Ok(ReconciledSeries::from_sorted(points.into_values().collect()))
    }
}

pub fn reconcile_forecast(
    history: &[MonthlySavings],
    forecast: &[Decimal],
    reference_date: NaiveDate,
) -> Result<ReconciledSeries> {
    ForecastReconciler::new(reference_date).reconcile(history, forecast)
}
