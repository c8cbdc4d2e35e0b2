/// Dashboard controller flow tests.
///
/// A scripted in-process service stands in for the backend; charts go to
/// the memory surface and everything else to a `RecordedView`.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::mpsc;

use classboard::DashboardError;
use classboard::charts::memory::MemorySurface;
use classboard::dashboard::view::RecordedView;
use classboard::dashboard::{CHART_SLOTS, DashboardController, Phase, UserAction};
use classboard::logging::{EventLog, FlowEvent};
use classboard::service::{ClearOutcome, PredictionRequest, PredictionResult, PredictionService};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Fake service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeService {
    predict_reply: RefCell<Option<Result<PredictionResult, DashboardError>>>,
    clear_reply: RefCell<Option<Result<ClearOutcome, DashboardError>>>,
    stats_replies: RefCell<VecDeque<Result<Value, DashboardError>>>,
    predict_calls: Cell<usize>,
    clear_calls: Cell<usize>,
    stats_calls: Cell<usize>,
    last_request: RefCell<Option<PredictionRequest>>,
}

impl FakeService {
    fn with_stats(stats: Value) -> Self {
        let svc = Self::default();
        svc.stats_replies.borrow_mut().push_back(Ok(stats));
        svc
    }

    fn queue_stats(&self, reply: Result<Value, DashboardError>) {
        self.stats_replies.borrow_mut().push_back(reply);
    }
}

impl PredictionService for FakeService {
    fn predict(&self, request: &PredictionRequest) -> classboard::Result<PredictionResult> {
        self.predict_calls.set(self.predict_calls.get() + 1);
        *self.last_request.borrow_mut() = Some(request.clone());
        self.predict_reply
            .borrow()
            .clone()
            .unwrap_or_else(|| Err(DashboardError::TransportError("no reply scripted".into())))
    }

    fn clear_history(&self) -> classboard::Result<ClearOutcome> {
        self.clear_calls.set(self.clear_calls.get() + 1);
        self.clear_reply
            .borrow()
            .clone()
            .unwrap_or_else(|| Err(DashboardError::TransportError("no reply scripted".into())))
    }

    /// Replays queued replies; the last one repeats.
    fn fetch_stats(&self) -> classboard::Result<Value> {
        self.stats_calls.set(self.stats_calls.get() + 1);
        let mut replies = self.stats_replies.borrow_mut();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err(DashboardError::TransportError("no stats scripted".into())))
        }
    }
}

type TestController = DashboardController<FakeService, MemorySurface, RecordedView>;

fn controller(service: FakeService, confirm: bool) -> TestController {
    DashboardController::new(
        service,
        MemorySurface::with_slots(CHART_SLOTS),
        RecordedView::answering(confirm),
        vec!["logistic_regression".to_string(), "naive_bayes".to_string()],
    )
}

fn stats(total: u64) -> Value {
    json!({
        "total_predictions": total,
        "predictions_by_class": [
            {"_id": "setosa", "count": 30},
            {"_id": "virginica", "count": 12}
        ],
        "predictions_by_model": [
            {"_id": "logistic_regression", "count": 22},
            {"_id": "naive_bayes", "count": 20}
        ],
        "confidence_distribution": [
            {"_id": "High (>90%)", "count": 40},
            {"_id": "Low (<70%)", "count": 2}
        ],
        "avg_confidence_by_model": [
            {"_id": "logistic_regression", "avg_confidence": 0.9},
            {"_id": "naive_bayes", "avg_confidence": 0.5}
        ],
        "recent_predictions": [
            {
                "timestamp": {"$date": "2024-01-15T10:30:00Z"},
                "model": "naive_bayes",
                "prediction": "setosa",
                "confidence": 0.97
            }
        ]
    })
}

fn empty_stats() -> Value {
    json!({
        "total_predictions": 0,
        "predictions_by_class": [],
        "predictions_by_model": [],
        "confidence_distribution": [],
        "avg_confidence_by_model": [],
        "recent_predictions": []
    })
}

fn setosa() -> PredictionResult {
    serde_json::from_value(json!({
        "prediction": "setosa",
        "confidence": 0.9731,
        "model_used": "naive_bayes",
        "prediction_index": 0,
        "probabilities": {"setosa": 0.9731, "versicolor": 0.02, "virginica": 0.0069}
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn refresh_renders_summary_charts_and_activity() {
    let mut ctl = controller(FakeService::with_stats(stats(42)), true);
    let report = ctl.refresh().unwrap();

    assert_eq!(report.charts_rendered, 4);
    assert_eq!(report.activity_rows, 1);
    assert_eq!(ctl.phase(), Phase::Idle);

    let summary = ctl.view().summary.clone().unwrap();
    assert_eq!(summary.total_predictions, "42");
    assert_eq!(summary.avg_confidence, "70.0%");
    assert_eq!(summary.models_used, "2");
    assert_eq!(summary.top_class, "setosa");

    let surface = ctl.charts().target();
    for slot in CHART_SLOTS {
        assert_eq!(surface.live_on(slot), 1, "slot {slot}");
    }
    let comparison = surface.chart_on("modelComparison").unwrap();
    assert_eq!(comparison.data.datasets[0].data, vec![90.0, 50.0]);

    assert_eq!(ctl.view().activity[0].prediction, "setosa");
    assert_eq!(ctl.view().activity[0].confidence, "97.00%");
}

#[test]
fn repeated_refresh_never_stacks_charts() {
    let mut ctl = controller(FakeService::with_stats(stats(42)), true);
    ctl.refresh().unwrap();
    ctl.refresh().unwrap();
    ctl.refresh().unwrap();
    assert_eq!(ctl.charts().live_count(), 4);
    assert_eq!(ctl.charts().target().live_count(), 4);
    assert_eq!(ctl.view().activity.len(), 1);
    assert_eq!(ctl.view().activity_rebuilds, 3);
}

#[test]
fn empty_history_shows_placeholders() {
    let mut ctl = controller(FakeService::with_stats(empty_stats()), true);
    ctl.refresh().unwrap();
    let summary = ctl.view().summary.clone().unwrap();
    assert_eq!(summary.total_predictions, "0");
    assert_eq!(summary.avg_confidence, "0.0%");
    assert_eq!(summary.top_class, "-");
    assert!(ctl.view().activity.is_empty());
    assert_eq!(ctl.charts().live_count(), 4);
}

#[test]
fn malformed_snapshot_is_a_silent_defect() {
    let mut bad = stats(42);
    bad.as_object_mut().unwrap().remove("recent_predictions");
    let mut ctl = controller(FakeService::with_stats(bad), true);

    let err = ctl.refresh().unwrap_err();
    assert!(matches!(err, DashboardError::MalformedSnapshot(_)));
    assert!(ctl.view().notifications.is_empty());
    assert!(ctl.view().summary.is_none());
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn missing_chart_slot_aborts_refresh_midway() {
    let mut ctl = DashboardController::new(
        FakeService::with_stats(stats(42)),
        MemorySurface::with_slots(CHART_SLOTS[..2].iter().copied()),
        RecordedView::answering(true),
        vec!["naive_bayes".to_string()],
    );

    let err = ctl.refresh().unwrap_err();
    assert_eq!(
        err,
        DashboardError::MissingRenderTarget("confidenceDistribution".to_string())
    );
    // Summary and the charts before the missing slot are already drawn;
    // the activity table and stored snapshot are left as they were.
    assert_eq!(ctl.view().summary.clone().unwrap().total_predictions, "42");
    assert_eq!(ctl.charts().live_count(), 2);
    assert_eq!(ctl.view().activity_rebuilds, 0);
    assert!(ctl.snapshot().is_none());
    assert!(ctl.view().notifications.is_empty());
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn failed_refresh_keeps_previous_display() {
    let service = FakeService::with_stats(stats(42));
    service.queue_stats(Err(DashboardError::TransportError("connection refused".into())));
    let mut ctl = controller(service, true);

    ctl.refresh().unwrap();
    let err = ctl.refresh().unwrap_err();
    assert!(matches!(err, DashboardError::TransportError(_)));
    assert_eq!(ctl.view().summary.clone().unwrap().total_predictions, "42");
    assert_eq!(ctl.snapshot().unwrap().total_predictions(), 42);
    assert_eq!(ctl.view().notifications.len(), 1);
    assert!(ctl.view().notifications[0].contains("connection refused"));
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[test]
fn submit_shows_result_then_refreshes() {
    let service = FakeService::with_stats(stats(43));
    *service.predict_reply.borrow_mut() = Some(Ok(setosa()));
    let mut ctl = controller(service, true);

    let result = ctl
        .submit_prediction(&["5.1", "3.5", "1.4", "0.2"], "naive_bayes")
        .unwrap();
    assert_eq!(result.prediction, "setosa");

    let shown = ctl.view().prediction.clone().unwrap();
    assert_eq!(shown.predicted_class, "setosa");
    assert_eq!(shown.confidence, "97.31%");

    let svc = ctl.service();
    assert_eq!(svc.predict_calls.get(), 1);
    assert_eq!(svc.stats_calls.get(), 1);
    let sent = svc.last_request.borrow().clone().unwrap();
    assert_eq!(sent.features, [5.1, 3.5, 1.4, 0.2]);
    assert_eq!(sent.model, "naive_bayes");
    assert_eq!(ctl.view().summary.clone().unwrap().total_predictions, "43");
}

#[test]
fn invalid_feature_never_reaches_service() {
    let mut ctl = controller(FakeService::with_stats(stats(1)), true);
    let err = ctl
        .submit_prediction(&["5.1", "3.5", "1.4", "abc"], "naive_bayes")
        .unwrap_err();

    assert!(matches!(err, DashboardError::InvalidInput(_)));
    assert_eq!(ctl.service().predict_calls.get(), 0);
    assert_eq!(ctl.service().stats_calls.get(), 0);
    assert_eq!(ctl.view().notifications.len(), 1);
    assert!(ctl.view().prediction.is_none());
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn unknown_model_never_reaches_service() {
    let mut ctl = controller(FakeService::with_stats(stats(1)), true);
    let err = ctl
        .submit_prediction(&["1", "2", "3", "4"], "random_forest")
        .unwrap_err();
    assert!(matches!(err, DashboardError::InvalidInput(_)));
    assert_eq!(ctl.service().predict_calls.get(), 0);
}

#[test]
fn service_error_is_shown_and_skips_refresh() {
    let service = FakeService::with_stats(stats(1));
    *service.predict_reply.borrow_mut() =
        Some(Err(DashboardError::ServiceError("model not found".into())));
    let mut ctl = controller(service, true);

    let err = ctl
        .submit_prediction(&["5.1", "3.5", "1.4", "0.2"], "naive_bayes")
        .unwrap_err();
    assert_eq!(err, DashboardError::ServiceError("model not found".into()));
    assert_eq!(ctl.view().notifications, vec!["model not found".to_string()]);
    assert_eq!(ctl.service().stats_calls.get(), 0);
    assert!(ctl.view().prediction.is_none());
    assert_eq!(ctl.phase(), Phase::Idle);
}

// ---------------------------------------------------------------------------
// Clear history
// ---------------------------------------------------------------------------

#[test]
fn declined_clear_sends_nothing() {
    let service = FakeService::with_stats(stats(5));
    *service.clear_reply.borrow_mut() = Some(Ok(ClearOutcome { deleted_count: 5 }));
    let mut ctl = controller(service, false);

    assert_eq!(ctl.clear_history().unwrap(), None);
    assert_eq!(ctl.view().confirmations_asked, 1);
    assert_eq!(ctl.service().clear_calls.get(), 0);
    assert_eq!(ctl.service().stats_calls.get(), 0);
    assert!(ctl.view().notifications.is_empty());
}

#[test]
fn confirmed_clear_reports_count_and_refreshes() {
    let service = FakeService::with_stats(empty_stats());
    *service.clear_reply.borrow_mut() = Some(Ok(ClearOutcome { deleted_count: 17 }));
    let mut ctl = controller(service, true);

    let outcome = ctl.clear_history().unwrap();
    assert_eq!(outcome, Some(ClearOutcome { deleted_count: 17 }));
    assert_eq!(ctl.view().notifications, vec!["Deleted 17 records".to_string()]);
    assert_eq!(ctl.service().stats_calls.get(), 1);
    assert_eq!(ctl.view().summary.clone().unwrap().total_predictions, "0");
}

#[test]
fn failed_clear_is_shown_and_skips_refresh() {
    let service = FakeService::with_stats(stats(5));
    *service.clear_reply.borrow_mut() =
        Some(Err(DashboardError::ServiceError("database unavailable".into())));
    let mut ctl = controller(service, true);

    assert!(ctl.clear_history().is_err());
    assert_eq!(ctl.view().notifications, vec!["database unavailable".to_string()]);
    assert_eq!(ctl.service().stats_calls.get(), 0);
    assert_eq!(ctl.phase(), Phase::Idle);
}

// ---------------------------------------------------------------------------
// Action loop
// ---------------------------------------------------------------------------

#[test]
fn queued_refreshes_after_refresh_are_coalesced() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("events.jsonl");
    let mut ctl = controller(FakeService::with_stats(stats(3)), true)
        .with_event_log(EventLog::at(&log_path));

    let (tx, rx) = mpsc::channel();
    tx.send(UserAction::Refresh).unwrap();
    tx.send(UserAction::Refresh).unwrap();
    tx.send(UserAction::Refresh).unwrap();
    drop(tx);

    ctl.run(rx).unwrap();
    assert_eq!(ctl.service().stats_calls.get(), 1);

    let events: Vec<FlowEvent> = std::fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let coalesced = events.iter().filter(|e| e.outcome == "coalesced").count();
    assert_eq!(coalesced, 2);
}

#[test]
fn refresh_queued_behind_failed_submit_runs_once() {
    let mut ctl = controller(FakeService::with_stats(stats(3)), true);

    let (tx, rx) = mpsc::channel();
    tx.send(UserAction::Submit {
        features: vec!["x".into(), "1".into(), "1".into(), "1".into()],
        model: "naive_bayes".into(),
    })
    .unwrap();
    tx.send(UserAction::Refresh).unwrap();
    tx.send(UserAction::Refresh).unwrap();
    drop(tx);

    ctl.run(rx).unwrap();
    assert_eq!(ctl.service().predict_calls.get(), 0);
    assert_eq!(ctl.service().stats_calls.get(), 1);
    assert_eq!(ctl.view().notifications.len(), 1);
}

#[test]
fn backlog_refresh_after_successful_submit_is_coalesced() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("events.jsonl");
    let service = FakeService::with_stats(stats(3));
    *service.predict_reply.borrow_mut() = Some(Ok(setosa()));
    let mut ctl = controller(service, true).with_event_log(EventLog::at(&log_path));

    let (tx, rx) = mpsc::channel();
    tx.send(UserAction::Submit {
        features: vec!["x".into(), "1".into(), "1".into(), "1".into()],
        model: "naive_bayes".into(),
    })
    .unwrap();
    tx.send(UserAction::Submit {
        features: vec!["5.1".into(), "3.5".into(), "1.4".into(), "0.2".into()],
        model: "naive_bayes".into(),
    })
    .unwrap();
    tx.send(UserAction::Refresh).unwrap();
    drop(tx);

    ctl.run(rx).unwrap();
    assert_eq!(ctl.service().predict_calls.get(), 1);
    assert_eq!(ctl.service().stats_calls.get(), 1);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.matches("\"coalesced\"").count(), 1);
}

#[test]
fn refresh_after_failed_refresh_still_runs() {
    let service = FakeService::default();
    service.queue_stats(Err(DashboardError::TransportError("timed out".into())));
    service.queue_stats(Ok(stats(8)));
    let mut ctl = controller(service, true);

    let (tx, rx) = mpsc::channel();
    tx.send(UserAction::Refresh).unwrap();
    drop(tx);
    ctl.run(rx).unwrap();

    let (tx, rx) = mpsc::channel();
    tx.send(UserAction::Refresh).unwrap();
    drop(tx);
    ctl.run(rx).unwrap();

    assert_eq!(ctl.service().stats_calls.get(), 2);
    assert_eq!(ctl.view().summary.clone().unwrap().total_predictions, "8");
}

#[test]
fn run_stops_on_defect() {
    let mut bad = stats(3);
    bad["avg_confidence_by_model"][0]["avg_confidence"] = json!(7.5);
    let mut ctl = controller(FakeService::with_stats(bad), true);

    let (tx, rx) = mpsc::channel();
    tx.send(UserAction::Refresh).unwrap();
    drop(tx);

    let err = ctl.run(rx).unwrap_err();
    assert!(err.is_defect());
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn dispatch_absorbs_user_errors() {
    let service = FakeService::with_stats(stats(3));
    *service.predict_reply.borrow_mut() =
        Some(Err(DashboardError::ServiceError("model not found".into())));
    let mut ctl = controller(service, true);

    let refreshed = ctl
        .dispatch(UserAction::Submit {
            features: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            model: "naive_bayes".into(),
        })
        .unwrap();
    assert!(!refreshed);
    assert!(ctl.dispatch(UserAction::Refresh).unwrap());
}
