//! End-to-end step runner behavior against scripted collaborators.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use stride_core_types::{PageId, PageRoute, SessionId};
use stride_runtime::{
    ExecutorKind, ProviderError, RecordingBrowser, RuntimeError, ScriptedLanguageProvider,
    ScriptedVisionProvider, SelectionReason, StepAction, StepRequest, StepRunner, StepSpec,
    ACTION_VERIFICATION_LABEL, SNAPSHOT_VERIFICATION_LABEL,
};
use stride_snapshot::{
    Element, Snapshot, SnapshotDiagnostics, SnapshotError, SnapshotOptions, SnapshotSource,
};
use stride_trace::{kind, MemoryTraceSink};
use stride_verify::predicates::{always_fail, url_contains, url_ends_with};
use stride_verify::{Verification, REASON_SNAPSHOT_EXHAUSTED};

/// Snapshot source that replays a fixed sequence, then repeats the last
/// snapshot. Records every requested limit.
struct ScriptedSnapshotSource {
    queue: Mutex<VecDeque<Snapshot>>,
    last: Mutex<Option<Snapshot>>,
    limits: Mutex<Vec<u32>>,
    fail_all: bool,
}

impl ScriptedSnapshotSource {
    fn new(snapshots: Vec<Snapshot>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(snapshots.into()),
            last: Mutex::new(None),
            limits: Mutex::new(Vec::new()),
            fail_all: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            limits: Mutex::new(Vec::new()),
            fail_all: true,
        })
    }

    fn limits(&self) -> Vec<u32> {
        self.limits.lock().clone()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshotSource {
    async fn capture(
        &self,
        _route: &PageRoute,
        options: SnapshotOptions,
    ) -> Result<Snapshot, SnapshotError> {
        self.limits.lock().push(options.limit);
        if self.fail_all {
            return Err(SnapshotError::extraction("page never settled"));
        }
        if let Some(snapshot) = self.queue.lock().pop_front() {
            *self.last.lock() = Some(snapshot.clone());
            return Ok(snapshot);
        }
        self.last
            .lock()
            .clone()
            .ok_or_else(|| SnapshotError::internal("script exhausted"))
    }
}

fn button(id: u64, text: &str) -> Element {
    Element::new(id, "button", text)
}

fn page(url: &str, elements: Vec<Element>) -> Snapshot {
    Snapshot::success(url, elements)
}

fn confident(snapshot: Snapshot, confidence: f64) -> Snapshot {
    snapshot.with_diagnostics(SnapshotDiagnostics::new(confidence))
}

fn route() -> PageRoute {
    PageRoute::for_page(SessionId("session-1".into()), PageId("page-1".into()))
}

/// Verification that gives the predicate exactly one polling attempt.
fn single_attempt(label: &str, predicate: Arc<dyn stride_verify::Predicate>) -> Verification {
    Verification::new(label, predicate)
        .with_timeout_ms(0)
        .with_poll_ms(0)
}

#[tokio::test]
async fn click_through_to_done_passes_with_one_structured_call() {
    let source = ScriptedSnapshotSource::new(vec![
        page("https://app.test/start", vec![button(1, "Go")]),
        page("https://app.test/done", vec![]),
    ]);
    let browser = RecordingBrowser::new();
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let sink = MemoryTraceSink::new();
    let runner = StepRunner::new(source.clone(), browser.clone(), structured.clone(), sink.clone());

    let step = StepSpec::new("reach the done page")
        .with_verification(Verification::new("url_done", url_ends_with("/done")));
    let report = runner
        .run_step(&StepRequest::new("finish the flow", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(structured.calls(), 1);
    assert_eq!(browser.element_clicks(), vec![1]);
    assert_eq!(report.executor, Some(ExecutorKind::Structured));
    assert_eq!(report.selection, Some(SelectionReason::Default));
    assert_eq!(report.vision_attempts, 0);

    // One terminal assertion per label.
    assert_eq!(report.assertions.len(), 1);
    let assertion = report.assertion("url_done").unwrap();
    assert!(assertion.passed && assertion.is_final && assertion.required);

    // Ramp starts at the base limit; no threshold means it never grows.
    assert_eq!(report.limits[0], 60);
    assert_eq!(report.limits, source.limits());
    assert_eq!(report.snapshot_captures, 2);

    // The element list reached the prompt.
    assert!(structured.prompts()[0].contains("[1]<button>"));

    // Trace: started + finished, one final verification record.
    assert_eq!(sink.events_of_kind(kind::STEP).len(), 2);
    let finals: Vec<_> = sink
        .events_of_kind(kind::VERIFICATION)
        .into_iter()
        .filter(|e| e.payload["final"] == json!(true))
        .collect();
    assert_eq!(finals.len(), 1);
}

#[tokio::test]
async fn ramp_grows_the_limit_until_confidence_recovers() {
    let source = ScriptedSnapshotSource::new(vec![
        confident(page("https://app.test", vec![]), 0.2),
        confident(page("https://app.test", vec![]), 0.9),
    ]);
    let browser = RecordingBrowser::new();
    let structured = Arc::new(ScriptedLanguageProvider::new(["FINISH"]));
    let runner = StepRunner::new(
        source.clone(),
        browser,
        structured,
        MemoryTraceSink::new(),
    );

    let step = StepSpec::new("wait for the page").with_min_confidence(0.5);
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(source.limits(), vec![60, 100]);
    assert_eq!(report.limits, vec![60, 100]);
    assert_eq!(report.snapshot_captures, 2);
    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions[0].action, Some(StepAction::Finish));
}

#[tokio::test]
async fn vision_fallback_recovers_a_failed_required_verification() {
    let source = ScriptedSnapshotSource::new(vec![
        page("https://app.test/start", vec![button(1, "Go")]),
        page("https://app.test/start", vec![button(1, "Go")]),
        page("https://app.test/done", vec![]),
    ]);
    let browser = RecordingBrowser::new();
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(120, 40)"]));
    let runner = StepRunner::new(
        source,
        browser.clone(),
        structured.clone(),
        MemoryTraceSink::new(),
    )
    .with_vision(vision.clone());

    let step = StepSpec::new("reach the done page")
        .with_vision()
        .with_verification(single_attempt("url_done", url_ends_with("/done")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(structured.calls(), 1);
    assert_eq!(vision.calls(), 1);
    assert_eq!(report.vision_attempts, 1);
    assert_eq!(browser.element_clicks(), vec![1]);
    assert_eq!(browser.clicks(), vec![(120.0, 40.0)]);
    assert_eq!(report.executor, Some(ExecutorKind::Vision));
    assert_eq!(report.selection, Some(SelectionReason::VisionFallback));

    // The retry replaced the failed attempt's assertions wholesale.
    assert_eq!(report.assertions.len(), 1);
    assert!(report.assertion("url_done").unwrap().passed);

    // The provider actually saw a screenshot.
    assert_eq!(vision.image_sizes().len(), 1);
    assert!(vision.image_sizes()[0] > 0);
}

#[tokio::test]
async fn canvas_short_circuit_goes_straight_to_vision() {
    let source = ScriptedSnapshotSource::new(vec![page(
        "https://app.test/canvas",
        vec![Element::new(1, "text", "chart")],
    )]);
    let browser = RecordingBrowser::new();
    browser.set_evaluate_result(json!(true));
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(200, 150)"]));
    let runner = StepRunner::new(
        source,
        browser.clone(),
        structured.clone(),
        MemoryTraceSink::new(),
    )
    .with_vision(vision.clone());

    let step = StepSpec::new("draw on the chart")
        .with_vision()
        .with_canvas_short_circuit(3)
        .with_verification(single_attempt("on_canvas_page", url_contains("canvas")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(structured.calls(), 0);
    assert_eq!(vision.calls(), 1);
    assert_eq!(report.vision_attempts, 1);
    assert_eq!(browser.clicks(), vec![(200.0, 150.0)]);
    assert_eq!(
        report.selection,
        Some(SelectionReason::CanvasShortCircuit { actionable_count: 0 })
    );

    // The page was probed exactly once.
    assert_eq!(browser.scripts().len(), 1);
    assert!(browser.scripts()[0].contains("canvas"));
}

#[tokio::test]
async fn failed_action_becomes_a_failed_assertion_then_vision_recovers() {
    let source = ScriptedSnapshotSource::new(vec![page(
        "https://app.test/form",
        vec![button(7, "Submit")],
    )]);
    let browser = RecordingBrowser::new();
    browser.fail_element_clicks(stride_runtime::BrowserError::ElementNotFound(7));
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(7)"]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(5, 5)"]));
    let runner = StepRunner::new(
        source,
        browser.clone(),
        structured.clone(),
        MemoryTraceSink::new(),
    )
    .with_vision(vision.clone());

    let step = StepSpec::new("submit the form")
        .with_vision()
        .with_verification(single_attempt("still_on_app", url_contains("app.test")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(vision.calls(), 1);

    assert_eq!(report.actions.len(), 2);
    assert!(!report.actions[0].success);
    assert_eq!(report.actions[0].executor, ExecutorKind::Structured);
    assert!(report.actions[0].error.as_deref().unwrap().contains("perform"));
    assert!(report.actions[1].success);

    // The synthetic action assertion was cleared by the retry.
    assert!(report.assertion(ACTION_VERIFICATION_LABEL).is_none());
    assert!(report.assertion("still_on_app").unwrap().passed);
}

#[tokio::test]
async fn unparseable_reply_falls_back_like_a_failed_action() {
    let source = ScriptedSnapshotSource::new(vec![page(
        "https://app.test/form",
        vec![button(1, "Go")],
    )]);
    let browser = RecordingBrowser::new();
    let structured = Arc::new(ScriptedLanguageProvider::new(["I cannot decide."]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(9, 9)"]));
    let runner = StepRunner::new(source, browser, structured.clone(), MemoryTraceSink::new())
        .with_vision(vision.clone());

    let step = StepSpec::new("go")
        .with_vision()
        .with_verification(single_attempt("still_on_app", url_contains("app.test")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(structured.calls(), 1);
    assert_eq!(vision.calls(), 1);
    assert!(!report.actions[0].success);
    assert!(report.actions[0].action.is_none());
    assert!(report.actions[0].error.as_deref().unwrap().contains("parse"));
}

#[tokio::test]
async fn provider_transport_failure_aborts_the_step() {
    let source = ScriptedSnapshotSource::new(vec![page("https://app.test", vec![button(1, "Go")])]);
    let structured = Arc::new(ScriptedLanguageProvider::failing(ProviderError::Unavailable(
        "credentials rejected".into(),
    )));
    let sink = MemoryTraceSink::new();
    let runner = StepRunner::new(source, RecordingBrowser::new(), structured, sink.clone());

    let step = StepSpec::new("go");
    let err = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::Provider(ProviderError::Unavailable(_))));
    // The step never reached its summary event.
    assert_eq!(sink.events_of_kind(kind::STEP).len(), 1);
}

#[tokio::test]
async fn required_failure_without_vision_fails_the_step() {
    let source = ScriptedSnapshotSource::new(vec![page(
        "https://app.test/start",
        vec![button(1, "Go")],
    )]);
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let sink = MemoryTraceSink::new();
    let runner = StepRunner::new(source, RecordingBrowser::new(), structured, sink.clone());

    let step = StepSpec::new("reach the done page")
        .with_verification(single_attempt("url_done", url_ends_with("/done")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(!report.passed);
    assert_eq!(report.vision_attempts, 0);
    let assertion = report.assertion("url_done").unwrap();
    assert!(!assertion.passed && assertion.is_final);

    // One attempt event plus exactly one final record.
    let events = sink.events_of_kind(kind::VERIFICATION);
    assert_eq!(events.len(), 2);
    assert_eq!(
        events.iter().filter(|e| e.payload["final"] == json!(true)).count(),
        1
    );
}

#[tokio::test]
async fn optional_failures_neither_fail_the_step_nor_trigger_fallback() {
    let source = ScriptedSnapshotSource::new(vec![page(
        "https://app.test/start",
        vec![button(1, "Go")],
    )]);
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(1, 1)"]));
    let runner = StepRunner::new(
        source,
        RecordingBrowser::new(),
        structured,
        MemoryTraceSink::new(),
    )
    .with_vision(vision.clone());

    let step = StepSpec::new("dismiss the banner")
        .with_vision()
        .with_verification(single_attempt("banner_gone", always_fail("still visible")).optional())
        .with_verification(single_attempt("still_on_app", url_contains("app.test")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(report.passed);
    assert_eq!(vision.calls(), 0);
    assert_eq!(report.vision_attempts, 0);

    // Verifications ran in declaration order and all reached the summary.
    assert_eq!(report.assertions.len(), 2);
    assert_eq!(report.assertions[0].label, "banner_gone");
    assert_eq!(report.assertions[1].label, "still_on_app");
    let banner = report.assertion("banner_gone").unwrap();
    assert!(!banner.passed && !banner.required);
}

#[tokio::test]
async fn vision_budget_bounds_fallback_attempts() {
    let source = ScriptedSnapshotSource::new(vec![page(
        "https://app.test/start",
        vec![button(1, "Go")],
    )]);
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(1, 1)"]));
    let runner = StepRunner::new(
        source,
        RecordingBrowser::new(),
        structured.clone(),
        MemoryTraceSink::new(),
    )
    .with_vision(vision.clone());

    let step = StepSpec::new("reach the done page")
        .with_vision()
        .with_max_vision_attempts(2)
        .with_verification(single_attempt("url_done", url_ends_with("/done")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(!report.passed);
    assert_eq!(structured.calls(), 1);
    assert_eq!(vision.calls(), 2);
    assert_eq!(report.vision_attempts, 2);
    assert_eq!(report.assertions.len(), 1);
    assert!(!report.assertion("url_done").unwrap().passed);
}

#[tokio::test]
async fn capture_blackout_without_vision_records_the_synthetic_assertion() {
    let source = ScriptedSnapshotSource::failing();
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let runner = StepRunner::new(
        source.clone(),
        RecordingBrowser::new(),
        structured.clone(),
        MemoryTraceSink::new(),
    );

    let step = StepSpec::new("go")
        .with_verification(single_attempt("url_done", url_ends_with("/done")));
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    assert!(!report.passed);
    // No snapshot, no executor, no model call.
    assert_eq!(structured.calls(), 0);
    assert!(report.executor.is_none());
    assert!(report.actions.is_empty());
    assert_eq!(source.limits().len(), 3);

    let assertion = report.assertion(SNAPSHOT_VERIFICATION_LABEL).unwrap();
    assert!(!assertion.passed && assertion.required);
    assert_eq!(assertion.reason_code(), Some(REASON_SNAPSHOT_EXHAUSTED));
}

#[tokio::test]
async fn capture_blackout_still_offers_the_vision_fallback() {
    let source = ScriptedSnapshotSource::failing();
    let structured = Arc::new(ScriptedLanguageProvider::new(["CLICK(1)"]));
    let vision = Arc::new(ScriptedVisionProvider::new(["CLICK_XY(50, 60)"]));
    let browser = RecordingBrowser::new();
    let runner = StepRunner::new(source, browser.clone(), structured.clone(), MemoryTraceSink::new())
        .with_vision(vision.clone());

    let step = StepSpec::new("go").with_vision().with_verification(
        Verification::new("url_done", url_ends_with("/done"))
            .with_poll_ms(0)
            .with_max_snapshot_attempts(2),
    );
    let report = runner
        .run_step(&StepRequest::new("task", route(), step))
        .await
        .unwrap();

    // Vision acted blind, but verification still could not see the page.
    assert!(!report.passed);
    assert_eq!(structured.calls(), 0);
    assert_eq!(vision.calls(), 1);
    assert_eq!(browser.clicks(), vec![(50.0, 60.0)]);

    let assertion = report.assertion("url_done").unwrap();
    assert_eq!(assertion.reason_code(), Some(REASON_SNAPSHOT_EXHAUSTED));
    // 3 ramp captures + 2 verification captures.
    assert_eq!(report.snapshot_captures, 5);
}
