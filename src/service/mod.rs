//! Prediction service boundary.
//!
//! The backend that stores predictions and serves statistics is a black box
//! reached through [`PredictionService`]. [`http::HttpPredictionService`] is
//! the real client; tests substitute in-process fakes.
//!
//! Endpoints:
//!
//! | Method | Path                 | Reply                                   |
//! |--------|----------------------|-----------------------------------------|
//! | POST   | `/api/predict`       | `{prediction, confidence}` or `{error}` |
//! | POST   | `/api/clear-history` | `{success, deleted_count}`              |
//! | GET    | `/api/stats`         | stats snapshot JSON                     |

pub mod http;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/predict`. Built only from validated input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub features: [f64; 4],
    pub model: String,
}

/// Successful prediction. Read-only to the dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionResult {
    pub prediction: String,
    pub confidence: f64,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub prediction_index: Option<u32>,
    /// Per-class probabilities, keyed by class label.
    #[serde(default)]
    pub probabilities: BTreeMap<String, f64>,
}

/// Successful history wipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    pub deleted_count: u64,
}

/// Access to the prediction backend.
pub trait PredictionService {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;

    fn clear_history(&self) -> Result<ClearOutcome>;

    /// Raw `/api/stats` payload; shape validation is the parser's job.
    fn fetch_stats(&self) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// Reply decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClearReply {
    success: bool,
    #[serde(default)]
    deleted_count: u64,
}

/// Surface a `{error: "..."}` payload as a [`DashboardError::ServiceError`].
pub fn reject_error_payload(reply: &Value) -> Result<()> {
    match reply.get("error") {
        Some(Value::String(msg)) => Err(DashboardError::ServiceError(msg.clone())),
        Some(other) => Err(DashboardError::ServiceError(other.to_string())),
        None => Ok(()),
    }
}

pub fn decode_prediction(reply: Value) -> Result<PredictionResult> {
    reject_error_payload(&reply)?;
    serde_json::from_value(reply)
        .map_err(|e| DashboardError::TransportError(format!("unexpected predict reply: {e}")))
}

pub fn decode_clear(reply: Value) -> Result<ClearOutcome> {
    reject_error_payload(&reply)?;
    let reply: ClearReply = serde_json::from_value(reply)
        .map_err(|e| DashboardError::TransportError(format!("unexpected clear reply: {e}")))?;
    if !reply.success {
        return Err(DashboardError::ServiceError(
            "the service could not clear the prediction history".to_string(),
        ));
    }
    Ok(ClearOutcome {
        deleted_count: reply.deleted_count,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
