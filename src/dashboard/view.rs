//! What the dashboard shows outside the charts: summary fields, the last
//! prediction, the recent-activity table, notifications and confirmations.

use chrono::Local;
use serde::Serialize;

use crate::service::PredictionResult;
use crate::stats::RecentPrediction;
use crate::stats::metrics::{DerivedMetrics, NO_TOP_CLASS};

// ---------------------------------------------------------------------------
// Display values
// ---------------------------------------------------------------------------

/// Summary fields above the charts, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_predictions: String,
    pub avg_confidence: String,
    pub models_used: String,
    pub top_class: String,
}

impl Summary {
    pub fn from_metrics(metrics: &DerivedMetrics) -> Self {
        Self {
            total_predictions: metrics.total_predictions.to_string(),
            avg_confidence: format!("{:.1}%", metrics.overall_average_confidence * 100.0),
            models_used: metrics.models_used.to_string(),
            top_class: metrics
                .top_class
                .clone()
                .unwrap_or_else(|| NO_TOP_CLASS.to_string()),
        }
    }
}

/// The prediction result panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionDisplay {
    pub predicted_class: String,
    pub confidence: String,
}

impl PredictionDisplay {
    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            predicted_class: result.prediction.clone(),
            confidence: format_percent(result.confidence),
        }
    }
}

/// One row of the recent-activity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    pub time: String,
    pub model: String,
    pub prediction: String,
    pub confidence: String,
}

impl ActivityRow {
    pub fn from_recent(recent: &RecentPrediction) -> Self {
        Self {
            time: recent
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            model: recent.model.clone(),
            prediction: recent.predicted_class.clone(),
            confidence: format_percent(recent.confidence),
        }
    }
}

/// `0.9731` -> `97.31%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

// ---------------------------------------------------------------------------
// View capability
// ---------------------------------------------------------------------------

/// The non-chart half of the UI.
pub trait DashboardView {
    fn show_summary(&mut self, summary: &Summary);

    fn show_prediction(&mut self, prediction: &PredictionDisplay);

    /// Replace every activity row with `rows`, in the given order.
    fn replace_activity(&mut self, rows: &[ActivityRow]);

    /// User notification for a failed or finished flow. The flow does not
    /// continue until this returns; a terminal view just prints the line,
    /// a graphical one would wait for the user to dismiss it.
    fn notify(&mut self, message: &str);

    /// Ask the user to confirm a destructive action.
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// A view that just keeps what it was told. Backs JSON output and tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordedView {
    pub summary: Option<Summary>,
    pub prediction: Option<PredictionDisplay>,
    pub activity: Vec<ActivityRow>,
    pub notifications: Vec<String>,
    #[serde(skip)]
    pub confirm_answer: bool,
    #[serde(skip)]
    pub confirmations_asked: usize,
    #[serde(skip)]
    pub activity_rebuilds: usize,
}

impl RecordedView {
    /// A view that answers every confirmation with `answer`.
    pub fn answering(answer: bool) -> Self {
        Self {
            confirm_answer: answer,
            ..Self::default()
        }
    }
}

impl DashboardView for RecordedView {
    fn show_summary(&mut self, summary: &Summary) {
        self.summary = Some(summary.clone());
    }

    fn show_prediction(&mut self, prediction: &PredictionDisplay) {
        self.prediction = Some(prediction.clone());
    }

    fn replace_activity(&mut self, rows: &[ActivityRow]) {
        self.activity = rows.to_vec();
        self.activity_rebuilds += 1;
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }

    fn confirm(&mut self, _prompt: &str) -> bool {
        self.confirmations_asked += 1;
        self.confirm_answer
    }
}
