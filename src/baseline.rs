use async_trait::async_trait;
use log::debug;
use rand::thread_rng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::collaborators::{ForecastRequest, ForecastResponse, Forecaster};
use crate::error::{ReconciliationError, Result};
use crate::schema::CategoryTotals;
use crate::utils::checked_sum;

/// Forecasts every future month as the recent average plus Gaussian noise.
#[derive(Debug, Clone)]
pub struct MovingAverageForecaster {
    horizon: usize,
    window: usize,
    noise_std_dev: f64,
}

impl Default for MovingAverageForecaster {
    fn default() -> Self {
        Self {
            horizon: 6,
            window: 3,
            noise_std_dev: 50.0,
        }
    }
}

impl MovingAverageForecaster {
    pub fn new(horizon: usize, window: usize, noise_std_dev: f64) -> Self {
        Self {
            horizon,
            window: window.max(1),
            noise_std_dev,
        }
    }

    /// Noise-free variant, useful for reproducible output.
    pub fn deterministic(horizon: usize) -> Self {
        Self::new(horizon, 3, 0.0)
    }

    fn recent_average(&self, past: &[Decimal]) -> Result<Decimal> {
        let start = past.len().saturating_sub(self.window);
        let recent = &past[start..];
        checked_sum(recent.iter().copied())
            .and_then(|total| total.checked_div(Decimal::from(recent.len())))
            .ok_or_else(|| {
                ReconciliationError::ForecastUnavailable(format!(
                    "savings over the last {} months are out of range",
                    recent.len()
                ))
            })
    }

    fn project(&self, average: Decimal) -> Result<Vec<Decimal>> {
        if self.noise_std_dev <= 0.0 {
            return Ok(vec![average.round_dp(2); self.horizon]);
        }

        let normal = Normal::new(0.0, self.noise_std_dev).map_err(|e| {
            ReconciliationError::ForecastUnavailable(format!("invalid noise setting: {}", e))
        })?;
        let mut rng = thread_rng();

        (0..self.horizon)
            .map(|_| {
                let noise = Decimal::from_f64(normal.sample(&mut rng)).unwrap_or_default();
                average
                    .checked_add(noise)
                    .map(|value| value.round_dp(2))
                    .ok_or_else(|| {
                        ReconciliationError::ForecastUnavailable(format!(
                            "average {} leaves the representable range",
                            average
                        ))
                    })
            })
            .collect()
    }
}

fn describe_trend(past: &[Decimal], average: Decimal) -> String {
    let trend = match (past.first(), past.last()) {
        (Some(first), Some(last)) if last > first => "increasing",
        _ => "declining",
    };
    format!(
        "Your savings trend appears to be {}. You're likely to save around ${} per month.",
        trend,
        average.round_dp(0)
    )
}

fn spending_advice(categories: &CategoryTotals) -> String {
    let top = categories
        .iter()
        .filter(|(_, total)| **total > Decimal::ZERO)
        .max_by(|a, b| a.1.cmp(b.1));

    match top {
        Some((name, total)) => format!(
            "You are spending heavily on '{}' (${:.2}). Consider reducing it for better savings.",
            name,
            total.to_f64().unwrap_or_default()
        ),
        None => "Not enough spending data to analyze categories. Try logging expenses more consistently."
            .to_string(),
    }
}

#[async_trait]
impl Forecaster for MovingAverageForecaster {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        if request.past_savings.is_empty() {
            return Err(ReconciliationError::ForecastUnavailable(
                "no savings history to forecast from".to_string(),
            ));
        }

        let average = self.recent_average(&request.past_savings)?;
        let forecasted_savings = self.project(average)?;
        debug!(
            "Moving average forecast: average {} over {} months, {} points",
            average,
            request.past_savings.len().min(self.window),
            forecasted_savings.len()
        );

        Ok(ForecastResponse {
            forecasted_savings,
            summary_prompt: Some(describe_trend(&request.past_savings, average)),
            advice_prompt: Some(spending_advice(&request.expense_by_category)),
        })
    }
}
