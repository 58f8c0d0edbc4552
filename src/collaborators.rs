//! Contracts for the external forecasting and optimizer services.
//!
//! Wire types mirror the JSON the services exchange:
//! `POST /api/savings/forecast` and `POST /api/invest`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::schema::{CategoryTotals, RiskProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastRequest {
    /// Chronological, most recent last
    pub past_savings: Vec<Decimal>,
    #[serde(default)]
    pub expense_by_category: CategoryTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastResponse {
    /// Next month first; the service does not label months.
    #[serde(default)]
    pub forecasted_savings: Vec<Decimal>,
    #[serde(default)]
    pub summary_prompt: Option<String>,
    #[serde(default)]
    pub advice_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvestmentRequest {
    pub amount: Decimal,
    pub risk_profile: RiskProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassAllocation {
    pub allocation: Decimal,
    #[serde(default, alias = "topAssets")]
    pub top_assets: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OptimizerResponse {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub risk_profile: Option<RiskProfile>,
    pub allocations: BTreeMap<String, ClassAllocation>,
}

/// Produces future savings values from past savings.
///
/// Implementations report every failure as `ForecastUnavailable`.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse>;
}

/// Splits an investable amount into asset classes and top assets.
///
/// Implementations report every failure as `AllocationUnavailable`.
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn optimize(&self, request: &InvestmentRequest) -> Result<OptimizerResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_forecast_response_tolerates_missing_fields() {
        let response: ForecastResponse =
            serde_json::from_str(r#"{"forecasted_savings": [100.5, -50]}"#).unwrap();
        assert_eq!(response.forecasted_savings, vec![dec!(100.5), dec!(-50)]);
        assert_eq!(response.summary_prompt, None);

        let empty: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.forecasted_savings.is_empty());
    }

    #[test]
    fn test_optimizer_response_wire_format() {
        let json = r#"{
            "amount": 5000,
            "risk_profile": "Balanced",
            "allocations": {
                "stocks": {"allocation": 1750, "top_assets": {"AAPL": 900.5, "MSFT": 849.5}},
                "gold": {"allocation": 500}
            }
        }"#;

        let response: OptimizerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.risk_profile, Some(RiskProfile::Balanced));
        assert_eq!(response.allocations.len(), 2);
        assert_eq!(
            response.allocations["stocks"].top_assets["AAPL"],
            dec!(900.5)
        );
        assert!(response.allocations["gold"].top_assets.is_empty());
    }

    #[test]
    fn test_forecast_request_serializes_snake_case() {
        let request = ForecastRequest {
            past_savings: vec![dec!(2000), dec!(500)],
            expense_by_category: BTreeMap::from([("Rent".to_string(), dec!(2400))]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("past_savings").is_some());
        assert_eq!(json["expense_by_category"]["Rent"], serde_json::json!(2400.0));
    }
}
