//! HTTP client for the prediction service.
//!
//! Synchronous `ureq` calls with a per-request timeout. The service answers
//! failures with a 4xx/5xx status and a `{error}` body; those become
//! [`DashboardError::ServiceError`] carrying the service's message. Anything
//! that never produced a readable reply is a
//! [`DashboardError::TransportError`].

use std::time::Duration;

use serde_json::Value;

use super::{ClearOutcome, PredictionRequest, PredictionResult, PredictionService};
use crate::config::schema::ServiceConfig;
use crate::error::{DashboardError, Result};

#[derive(Debug, Clone)]
pub struct HttpPredictionService {
    base_url: String,
    timeout: Duration,
}

impl HttpPredictionService {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        // "localhost" may resolve to ::1 first and stall when the service
        // only binds IPv4.
        let base_url = base_url
            .trim_end_matches('/')
            .replace("://localhost", "://127.0.0.1");
        Self { base_url, timeout }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.base_url, Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl PredictionService for HttpPredictionService {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let reply = read_json(
            ureq::post(&self.url("/api/predict"))
                .timeout(self.timeout)
                .send_json(request),
        )?;
        super::decode_prediction(reply)
    }

    fn clear_history(&self) -> Result<ClearOutcome> {
        let reply = read_json(
            ureq::post(&self.url("/api/clear-history"))
                .timeout(self.timeout)
                .call(),
        )?;
        super::decode_clear(reply)
    }

    fn fetch_stats(&self) -> Result<Value> {
        let reply = read_json(
            ureq::get(&self.url("/api/stats"))
                .timeout(self.timeout)
                .call(),
        )?;
        super::reject_error_payload(&reply)?;
        Ok(reply)
    }
}

/// Turn a ureq outcome into a JSON body, keeping error-status bodies so the
/// service's own message reaches the user.
fn read_json(outcome: std::result::Result<ureq::Response, ureq::Error>) -> Result<Value> {
    let (status, response) = match outcome {
        Ok(resp) => (resp.status(), resp),
        Err(ureq::Error::Status(code, resp)) => (code, resp),
        Err(e) => return Err(DashboardError::TransportError(e.to_string())),
    };

    let body = response
        .into_string()
        .map_err(|e| DashboardError::TransportError(format!("failed to read reply: {e}")))?;

    match serde_json::from_str::<Value>(&body) {
        Ok(value) if status >= 400 => {
            super::reject_error_payload(&value)?;
            Err(DashboardError::ServiceError(format!(
                "service returned HTTP {status}"
            )))
        }
        Ok(value) => Ok(value),
        Err(_) if status >= 400 => Err(DashboardError::ServiceError(format!(
            "service returned HTTP {status}"
        ))),
        Err(e) => Err(DashboardError::TransportError(format!(
            "reply is not JSON: {e}"
        ))),
    }
}
