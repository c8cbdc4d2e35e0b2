//! Dashboard controller: drives the predict, clear-history and refresh
//! flows.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ Fetching ──▶ Rendering ──▶ Idle
//! Idle ──clear───▶ Clearing ────ok──▶ Fetching ──▶ Rendering ──▶ Idle
//! Idle ──refresh─────────────────────▶ Fetching ──▶ Rendering ──▶ Idle
//! ```
//!
//! Every flow takes `&mut self`, so two flows can never interleave on one
//! controller. A failure at any step returns the controller to `Idle`.
//! User-recoverable failures (bad input, service errors, transport errors)
//! are shown through [`DashboardView::notify`]; defects are logged and
//! returned to the caller without a notification.
//!
//! [`DashboardController::run`] consumes actions from a channel. Refresh
//! triggers that pile up while a flow is in flight are coalesced: if that
//! flow already ended with a refresh they are dropped, otherwise at most one
//! of them runs.

pub mod input;
pub mod view;

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;

use crate::charts::{ChartKind, ChartRegistry, RenderTarget};
use crate::error::{DashboardError, Result};
use crate::logging::{EventLog, FlowEvent};
use crate::service::{ClearOutcome, PredictionResult, PredictionService};
use crate::stats::metrics::DerivedMetrics;
use crate::stats::{self, LabelCount, StatsSnapshot};

use view::{ActivityRow, DashboardView, PredictionDisplay, Summary};

// ---------------------------------------------------------------------------
// Chart slots
// ---------------------------------------------------------------------------

pub const CLASS_CHART: &str = "predictionsByClass";
pub const MODEL_CHART: &str = "predictionsByModel";
pub const CONFIDENCE_CHART: &str = "confidenceDistribution";
pub const COMPARISON_CHART: &str = "modelComparison";

/// Every chart slot the dashboard renders, in render order.
pub const CHART_SLOTS: [&str; 4] = [CLASS_CHART, MODEL_CHART, CONFIDENCE_CHART, COMPARISON_CHART];

const CLEAR_PROMPT: &str = "Are you sure you want to clear prediction history?";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Clearing,
    Fetching,
    Rendering,
}

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Submit { features: Vec<String>, model: String },
    ClearHistory,
    Refresh,
}

/// What a completed refresh put on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub metrics: DerivedMetrics,
    pub charts_rendered: usize,
    pub activity_rows: usize,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct DashboardController<S, T, V>
where
    S: PredictionService,
    T: RenderTarget,
    V: DashboardView,
{
    service: S,
    charts: ChartRegistry<T>,
    view: V,
    known_models: Vec<String>,
    log: EventLog,
    phase: Phase,
    snapshot: Option<StatsSnapshot>,
}

impl<S, T, V> DashboardController<S, T, V>
where
    S: PredictionService,
    T: RenderTarget,
    V: DashboardView,
{
    pub fn new(service: S, target: T, view: V, known_models: Vec<String>) -> Self {
        Self {
            service,
            charts: ChartRegistry::new(target),
            view,
            known_models,
            log: EventLog::disabled(),
            phase: Phase::Idle,
            snapshot: None,
        }
    }

    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The snapshot behind what is currently on screen.
    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn charts(&self) -> &ChartRegistry<T> {
        &self.charts
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Destroy every live chart.
    pub fn teardown(&mut self) {
        self.charts.teardown();
    }

    // -----------------------------------------------------------------------
    // Flows
    // -----------------------------------------------------------------------

    /// Validate the form, request a prediction, show it and refresh.
    ///
    /// Invalid input never reaches the service. A service or transport
    /// failure is shown to the user and skips the refresh.
    pub fn submit_prediction<F: AsRef<str>>(
        &mut self,
        features: &[F],
        model: &str,
    ) -> Result<PredictionResult> {
        let request = match input::build_request(features, model, &self.known_models) {
            Ok(request) => request,
            Err(err) => return Err(self.fail("predict", err)),
        };

        self.phase = Phase::Submitting;
        let result = match self.service.predict(&request) {
            Ok(result) => result,
            Err(err) => return Err(self.fail("predict", err)),
        };

        self.view
            .show_prediction(&PredictionDisplay::from_result(&result));
        self.log.record(&FlowEvent::new(
            "predict",
            "ok",
            Some(format!("{} ({})", result.prediction, request.model)),
        ));

        self.refresh()?;
        Ok(result)
    }

    /// Ask for confirmation, wipe the history and refresh.
    ///
    /// Returns `Ok(None)` when the user declines; no request is sent.
    pub fn clear_history(&mut self) -> Result<Option<ClearOutcome>> {
        if !self.view.confirm(CLEAR_PROMPT) {
            self.log.record(&FlowEvent::new("clear", "cancelled", None));
            return Ok(None);
        }

        self.phase = Phase::Clearing;
        let outcome = match self.service.clear_history() {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail("clear", err)),
        };

        self.view
            .notify(&format!("Deleted {} records", outcome.deleted_count));
        self.log.record(&FlowEvent::new(
            "clear",
            "ok",
            Some(format!("{} deleted", outcome.deleted_count)),
        ));

        self.refresh()?;
        Ok(Some(outcome))
    }

    /// Fetch, parse and derive, then redraw summary, charts and activity.
    ///
    /// Nothing changes on screen if the fetch or parse fails. A missing
    /// chart slot is a defect found mid-render: the summary and the charts
    /// before it are already redrawn, while the activity table and
    /// [`snapshot`](Self::snapshot) keep the previous refresh.
    pub fn refresh(&mut self) -> Result<RefreshReport> {
        match self.try_refresh() {
            Ok(report) => {
                self.phase = Phase::Idle;
                self.log.record(&FlowEvent::new(
                    "refresh",
                    "ok",
                    Some(format!("{} predictions", report.metrics.total_predictions)),
                ));
                Ok(report)
            }
            Err(err) => Err(self.fail("refresh", err)),
        }
    }

    fn try_refresh(&mut self) -> Result<RefreshReport> {
        self.phase = Phase::Fetching;
        let raw = self.service.fetch_stats()?;
        let snapshot = stats::parse_snapshot(&raw)?;
        let metrics = DerivedMetrics::compute(&snapshot);

        self.phase = Phase::Rendering;
        self.view.show_summary(&Summary::from_metrics(&metrics));

        let mut charts_rendered = 0;
        for (slot, kind, labels, values, title) in chart_plan(&snapshot) {
            self.charts.render(slot, kind, labels, values, title)?;
            charts_rendered += 1;
        }

        let rows: Vec<ActivityRow> = snapshot
            .recent_predictions()
            .iter()
            .map(ActivityRow::from_recent)
            .collect();
        self.view.replace_activity(&rows);

        self.snapshot = Some(snapshot);
        Ok(RefreshReport {
            metrics,
            charts_rendered,
            activity_rows: rows.len(),
        })
    }

    /// Common failure path: back to idle, log, and tell the user unless the
    /// error is a defect.
    fn fail(&mut self, flow: &str, err: DashboardError) -> DashboardError {
        self.phase = Phase::Idle;
        self.log.record(&FlowEvent::failure(flow, &err));
        if !err.is_defect() {
            self.view.notify(&err.to_string());
        }
        err
    }

    // -----------------------------------------------------------------------
    // Action loop
    // -----------------------------------------------------------------------

    /// Run one action. Returns whether it finished with a successful
    /// refresh. User-recoverable failures have already been shown and are
    /// absorbed; defects are returned.
    pub fn dispatch(&mut self, action: UserAction) -> Result<bool> {
        let outcome = match action {
            UserAction::Submit { features, model } => {
                self.submit_prediction(&features, &model).map(|_| true)
            }
            UserAction::ClearHistory => self.clear_history().map(|o| o.is_some()),
            UserAction::Refresh => self.refresh().map(|_| true),
        };

        match outcome {
            Ok(refreshed) => Ok(refreshed),
            Err(err) if err.is_defect() => Err(err),
            Err(_) => Ok(false),
        }
    }

    /// Process actions until the sender hangs up or a defect occurs.
    ///
    /// A `Refresh` that comes up right after an action which itself ended
    /// with a refresh is skipped, whether it was queued long ago or just
    /// arrived.
    pub fn run(&mut self, actions: Receiver<UserAction>) -> Result<()> {
        let mut backlog: VecDeque<UserAction> = VecDeque::new();
        let mut last_refreshed = false;
        loop {
            let action = match backlog.pop_front() {
                Some(action) => action,
                None => match actions.recv() {
                    Ok(action) => action,
                    Err(_) => return Ok(()),
                },
            };

            if action == UserAction::Refresh && last_refreshed {
                self.log.record(&FlowEvent::new("refresh", "coalesced", None));
                continue;
            }

            last_refreshed = self.dispatch(action)?;

            let queued: Vec<UserAction> = actions.try_iter().collect();
            let (kept, dropped) = coalesce_refreshes(queued, last_refreshed);
            for _ in 0..dropped {
                self.log.record(&FlowEvent::new("refresh", "coalesced", None));
            }
            backlog.extend(kept);
        }
    }
}

/// Collapse refresh triggers that queued while a flow was in flight.
///
/// When that flow ended with a refresh, every queued trigger is redundant.
/// Otherwise the first one is kept. Other actions keep their order. Returns
/// the kept actions and how many triggers were dropped.
pub fn coalesce_refreshes(queued: Vec<UserAction>, just_refreshed: bool) -> (Vec<UserAction>, usize) {
    let mut refresh_seen = just_refreshed;
    let mut dropped = 0;
    let kept = queued
        .into_iter()
        .filter(|action| {
            if *action != UserAction::Refresh {
                return true;
            }
            if refresh_seen {
                dropped += 1;
                false
            } else {
                refresh_seen = true;
                true
            }
        })
        .collect();
    (kept, dropped)
}

/// The four dashboard charts for a snapshot: slot, kind, labels, values,
/// title.
fn chart_plan(
    snapshot: &StatsSnapshot,
) -> [(&'static str, ChartKind, Vec<String>, Vec<f64>, &'static str); 4] {
    let (class_labels, class_counts) = split_counts(snapshot.predictions_by_class());
    let (model_labels, model_counts) = split_counts(snapshot.predictions_by_model());
    let (bucket_labels, bucket_counts) = split_counts(snapshot.confidence_distribution());
    let averages = snapshot.avg_confidence_by_model();

    [
        (
            CLASS_CHART,
            ChartKind::Bar,
            class_labels,
            class_counts,
            "Predictions by Species",
        ),
        (
            MODEL_CHART,
            ChartKind::Pie,
            model_labels,
            model_counts,
            "Predictions by Model",
        ),
        (
            CONFIDENCE_CHART,
            ChartKind::Doughnut,
            bucket_labels,
            bucket_counts,
            "Confidence Distribution",
        ),
        (
            COMPARISON_CHART,
            ChartKind::Bar,
            averages.iter().map(|m| m.model.clone()).collect(),
            averages
                .iter()
                .map(|m| (m.avg_confidence * 1000.0).round() / 10.0)
                .collect(),
            "Avg Confidence (%)",
        ),
    ]
}

fn split_counts(entries: &[LabelCount]) -> (Vec<String>, Vec<f64>) {
    entries
        .iter()
        .map(|e| (e.label.clone(), e.count as f64))
        .unzip()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
