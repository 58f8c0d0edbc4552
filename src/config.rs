use crate::error::{ReconciliationError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Tunables for the reconciliation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of leading forecast months summed into `forecast_sum`.
    pub forecast_metric_window: usize,
    /// Trailing months included in the savings/expenses comparison.
    pub recent_months: usize,
    /// Category used for transactions with a missing or blank category.
    pub default_category: String,
    /// Relative slack allowed when top assets are checked against their class allocation.
    pub allocation_tolerance: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            forecast_metric_window: 6,
            recent_months: 6,
            default_category: DEFAULT_CATEGORY.to_string(),
            allocation_tolerance: Decimal::new(1, 6),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.forecast_metric_window == 0 {
            return Err(ReconciliationError::InvalidConfig(
                "forecast_metric_window must be at least 1".to_string(),
            ));
        }
        if self.allocation_tolerance < Decimal::ZERO {
            return Err(ReconciliationError::InvalidConfig(format!(
                "allocation_tolerance must be non-negative, got {}",
                self.allocation_tolerance
            )));
        }
        if self.default_category.trim().is_empty() {
            return Err(ReconciliationError::InvalidConfig(
                "default_category must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the forecasting and optimizer services live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorEndpoints {
    pub forecast_url: String,
    pub optimizer_url: String,
    pub timeout_secs: u64,
}

impl Default for CollaboratorEndpoints {
    fn default() -> Self {
        Self {
            forecast_url: DEFAULT_SERVICE_URL.to_string(),
            optimizer_url: DEFAULT_SERVICE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl CollaboratorEndpoints {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            forecast_url: env::var("FORECAST_SERVICE_URL").unwrap_or(defaults.forecast_url),
            optimizer_url: env::var("OPTIMIZER_SERVICE_URL").unwrap_or(defaults.optimizer_url),
            timeout_secs: env::var("COLLABORATOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
