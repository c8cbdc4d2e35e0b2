//! Stats snapshot: typed aggregates parsed from the service's `/api/stats`
//! payload.
//!
//! The service answers with grouped counts (`{_id, count}`), per-model
//! averages (`{_id, avg_confidence}`) and the most recent prediction records.
//! [`parse_snapshot`] validates that payload against the data contract and
//! produces an immutable [`StatsSnapshot`]; anything that does not fit is a
//! [`DashboardError::MalformedSnapshot`]. Values are surfaced, never clamped.
//!
//! Derived numbers live in [`metrics`].

pub mod metrics;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DashboardError, Result};

/// Label used when a grouped entry has a null `_id`.
pub const UNKNOWN_LABEL: &str = "unknown";

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// A `(label, count)` pair from one of the grouped aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

/// Average confidence for one model, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfidence {
    pub model: String,
    pub avg_confidence: f64,
}

/// One row of the recent-activity feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentPrediction {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub predicted_class: String,
    pub confidence: f64,
}

/// Immutable point-in-time read of the service's aggregated statistics.
///
/// Only constructed by [`parse_snapshot`]; every refresh produces a fresh
/// value and nothing mutates one after it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    total_predictions: u64,
    predictions_by_class: Vec<LabelCount>,
    predictions_by_model: Vec<LabelCount>,
    confidence_distribution: Vec<LabelCount>,
    avg_confidence_by_model: Vec<ModelConfidence>,
    recent_predictions: Vec<RecentPrediction>,
}

impl StatsSnapshot {
    pub fn total_predictions(&self) -> u64 {
        self.total_predictions
    }

    pub fn predictions_by_class(&self) -> &[LabelCount] {
        &self.predictions_by_class
    }

    pub fn predictions_by_model(&self) -> &[LabelCount] {
        &self.predictions_by_model
    }

    pub fn confidence_distribution(&self) -> &[LabelCount] {
        &self.confidence_distribution
    }

    pub fn avg_confidence_by_model(&self) -> &[ModelConfidence] {
        &self.avg_confidence_by_model
    }

    /// Recent predictions in whatever order the service returned them.
    pub fn recent_predictions(&self) -> &[RecentPrediction] {
        &self.recent_predictions
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    total_predictions: u64,
    predictions_by_class: Vec<RawCount>,
    predictions_by_model: Vec<RawCount>,
    confidence_distribution: Vec<RawCount>,
    avg_confidence_by_model: Vec<RawAverage>,
    recent_predictions: Vec<RawRecent>,
}

#[derive(Debug, Deserialize)]
struct RawCount {
    #[serde(rename = "_id", default)]
    id: Value,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct RawAverage {
    #[serde(rename = "_id", default)]
    id: Value,
    avg_confidence: Value,
}

/// Stored prediction record. The service sends more (features,
/// probabilities, prediction index); only the displayed fields are kept.
#[derive(Debug, Deserialize)]
struct RawRecent {
    timestamp: Value,
    model: String,
    prediction: String,
    confidence: f64,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Validate a raw `/api/stats` payload and build a [`StatsSnapshot`].
///
/// Every aggregate must be present as an array (possibly empty). Counts must
/// be non-negative integers, per-model averages and recent confidences must
/// be finite numbers in `[0, 1]`, and every recent timestamp must be a
/// recognizable date.
pub fn parse_snapshot(raw: &Value) -> Result<StatsSnapshot> {
    let raw = RawSnapshot::deserialize(raw)
        .map_err(|e| DashboardError::MalformedSnapshot(e.to_string()))?;

    let avg_confidence_by_model = raw
        .avg_confidence_by_model
        .into_iter()
        .map(|entry| {
            let model = label_of(&entry.id);
            let avg = entry.avg_confidence.as_f64().ok_or_else(|| {
                DashboardError::MalformedSnapshot(format!(
                    "avg_confidence for model '{model}' is not a number: {}",
                    entry.avg_confidence
                ))
            })?;
            check_unit_interval(avg, || format!("avg_confidence for model '{model}'"))?;
            Ok(ModelConfidence {
                model,
                avg_confidence: avg,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let recent_predictions = raw
        .recent_predictions
        .into_iter()
        .enumerate()
        .map(|(i, rec)| {
            check_unit_interval(rec.confidence, || format!("recent_predictions[{i}].confidence"))?;
            let timestamp = parse_timestamp(&rec.timestamp).ok_or_else(|| {
                DashboardError::MalformedSnapshot(format!(
                    "recent_predictions[{i}].timestamp is not a date: {}",
                    rec.timestamp
                ))
            })?;
            Ok(RecentPrediction {
                timestamp,
                model: rec.model,
                predicted_class: rec.prediction,
                confidence: rec.confidence,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StatsSnapshot {
        total_predictions: raw.total_predictions,
        predictions_by_class: to_label_counts(raw.predictions_by_class),
        predictions_by_model: to_label_counts(raw.predictions_by_model),
        confidence_distribution: to_label_counts(raw.confidence_distribution),
        avg_confidence_by_model,
        recent_predictions,
    })
}

fn to_label_counts(entries: Vec<RawCount>) -> Vec<LabelCount> {
    entries
        .into_iter()
        .map(|e| LabelCount {
            label: label_of(&e.id),
            count: e.count,
        })
        .collect()
}

/// Group keys are usually strings; numbers are stringified and a missing
/// group field comes back as null.
fn label_of(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Null => UNKNOWN_LABEL.to_string(),
        other => other.to_string(),
    }
}

fn check_unit_interval(value: f64, what: impl FnOnce() -> String) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DashboardError::MalformedSnapshot(format!(
            "{} out of range [0, 1]: {value}",
            what()
        )))
    }
}

/// Accepts extended JSON (`{"$date": ...}`, `{"$numberLong": "..."}`),
/// RFC 3339 / RFC 2822 strings and epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            if let Some(inner) = map.get("$date") {
                parse_timestamp(inner)
            } else {
                map.get("$numberLong")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(DateTime::from_timestamp_millis)
            }
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_rfc2822(s))
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
