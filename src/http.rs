use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collaborators::{
    ForecastRequest, ForecastResponse, Forecaster, InvestmentRequest, Optimizer, OptimizerResponse,
};
use crate::config::CollaboratorEndpoints;
use crate::error::{ReconciliationError, Result};

const FORECAST_PATH: &str = "/api/savings/forecast";
const INVEST_PATH: &str = "/api/invest";

fn create_client(endpoints: &CollaboratorEndpoints) -> std::result::Result<Client, String> {
    Client::builder()
        .timeout(endpoints.timeout())
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))
}

/// POSTs `body` as JSON and decodes the JSON reply. Errors are plain messages
/// so each caller can wrap them in its own unavailability variant.
async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    body: &B,
) -> std::result::Result<R, String> {
    let res = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request to {} failed: {}", url, e))?;

    let status = res.status();
    if !status.is_success() {
        let error_text = res.text().await.unwrap_or_default();
        return Err(format!("{} returned status {}: {}", url, status, error_text));
    }

    res.json::<R>()
        .await
        .map_err(|e| format!("invalid response from {}: {}", url, e))
}

#[derive(Clone)]
pub struct HttpForecaster {
    client: Client,
    url: String,
}

impl HttpForecaster {
    pub fn new(endpoints: &CollaboratorEndpoints) -> Result<Self> {
        let client = create_client(endpoints).map_err(ReconciliationError::ForecastUnavailable)?;
        Ok(Self {
            client,
            url: format!("{}{}", endpoints.forecast_url.trim_end_matches('/'), FORECAST_PATH),
        })
    }
}

#[async_trait]
impl Forecaster for HttpForecaster {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        debug!(
            "Requesting forecast for {} past months from {}",
            request.past_savings.len(),
            self.url
        );
        post_json(&self.client, &self.url, request)
            .await
            .map_err(|message| {
                warn!("Forecast call failed: {}", message);
                ReconciliationError::ForecastUnavailable(message)
            })
    }
}

#[derive(Clone)]
pub struct HttpOptimizer {
    client: Client,
    url: String,
}

impl HttpOptimizer {
    pub fn new(endpoints: &CollaboratorEndpoints) -> Result<Self> {
        let client =
            create_client(endpoints).map_err(ReconciliationError::AllocationUnavailable)?;
        Ok(Self {
            client,
            url: format!("{}{}", endpoints.optimizer_url.trim_end_matches('/'), INVEST_PATH),
        })
    }
}

#[async_trait]
impl Optimizer for HttpOptimizer {
    async fn optimize(&self, request: &InvestmentRequest) -> Result<OptimizerResponse> {
        debug!(
            "Requesting {:?} allocation of {} from {}",
            request.risk_profile, request.amount, self.url
        );
        post_json(&self.client, &self.url, request)
            .await
            .map_err(|message| {
                warn!("Optimizer call failed: {}", message);
                ReconciliationError::AllocationUnavailable(message)
            })
    }
}
