//! Derived metrics: values computed client-side from a [`StatsSnapshot`].
//!
//! Pure functions with no rendering dependency.

use super::StatsSnapshot;

/// Display value for [`top_predicted_class`] returning `None`.
pub const NO_TOP_CLASS: &str = "-";

/// Unweighted mean of the per-model average confidences.
///
/// Each model counts once regardless of how many predictions it made, so
/// models at 0.9 and 0.5 give 0.7. Returns 0.0 when no model has an average.
pub fn overall_average_confidence(snapshot: &StatsSnapshot) -> f64 {
    let averages = snapshot.avg_confidence_by_model();
    if averages.is_empty() {
        return 0.0;
    }
    averages.iter().map(|m| m.avg_confidence).sum::<f64>() / averages.len() as f64
}

/// Class label with the highest count, or `None` when there are no classes.
///
/// Ties go to the entry that appears first in the snapshot, i.e. the head of
/// a stable descending sort by count.
pub fn top_predicted_class(snapshot: &StatsSnapshot) -> Option<&str> {
    let mut ranked: Vec<_> = snapshot.predictions_by_class().iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.first().map(|entry| entry.label.as_str())
}

/// Number of distinct models that appear in the per-model counts.
pub fn models_used(snapshot: &StatsSnapshot) -> usize {
    snapshot.predictions_by_model().len()
}

/// The summary numbers shown above the charts.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub total_predictions: u64,
    pub overall_average_confidence: f64,
    pub models_used: usize,
    pub top_class: Option<String>,
}

impl DerivedMetrics {
    pub fn compute(snapshot: &StatsSnapshot) -> Self {
        Self {
            total_predictions: snapshot.total_predictions(),
            overall_average_confidence: overall_average_confidence(snapshot),
            models_used: models_used(snapshot),
            top_class: top_predicted_class(snapshot).map(str::to_string),
        }
    }
}
