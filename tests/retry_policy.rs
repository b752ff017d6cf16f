//! Attempt counting, backoff timing and cancellation for the response client.
//!
//! All tests run on a paused clock so delays are observed exactly without sleeping.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use lca_insight::clients::response::degraded_response;
use lca_insight::clients::{InvokeError, ModelInvoker, ResponseClient};
use lca_insight::config::AiConfig;
use lca_insight::schemas::RequestKind;

enum Step {
    Fail,
    Hang,
    Reply(&'static str),
}

/// Plays back `steps` in order, failing once they run out, and records when each call started.
struct Scripted {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Instant>>,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for Scripted {
    async fn invoke(&self, _prompt: &str, _deadline: Duration) -> Result<String, InvokeError> {
        self.calls.lock().unwrap().push(Instant::now());
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Fail);
        match step {
            Step::Fail => Err(InvokeError::Status {
                status: 503,
                body: "unavailable".into(),
            }),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(InvokeError::Transport("hung".into()))
            }
            Step::Reply(text) => Ok(text.to_string()),
        }
    }
}

fn ai_config(max_retries: u32, timeout_ms: u64, backoff_ms: u64) -> AiConfig {
    AiConfig {
        max_retries,
        timeout_ms,
        backoff_ms,
        ..AiConfig::default()
    }
}

fn assert_close(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_makes_exactly_max_retries_attempts() {
    let invoker = Scripted::new(vec![]);
    let client = ResponseClient::with_invoker(&ai_config(3, 1_000, 100), invoker.clone());

    let start = Instant::now();
    let reply = client
        .respond(RequestKind::GenerateReport, "prompt", None)
        .await;
    let elapsed = start.elapsed();

    let calls = invoker.call_times();
    assert_eq!(calls.len(), 3);
    // 1 unit before the second attempt, 2 units before the third, nothing after.
    assert_close(calls[1] - calls[0], 100);
    assert_close(calls[2] - calls[1], 200);
    assert_close(elapsed, 300);

    assert!(reply.degraded);
    assert_eq!(reply.text, degraded_response(RequestKind::GenerateReport));
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_as_failed_attempt() {
    let invoker = Scripted::new(vec![Step::Hang, Step::Reply(r#"{"a":1}"#)]);
    let client = ResponseClient::with_invoker(&ai_config(3, 50, 100), invoker.clone());

    let start = Instant::now();
    let text = client
        .get_response(RequestKind::SuggestMissingParameters, "prompt")
        .await;

    assert_eq!(text, r#"{"a":1}"#);
    assert_eq!(invoker.call_times().len(), 2);
    assert_close(start.elapsed(), 150);
}

#[tokio::test(start_paused = true)]
async fn empty_text_is_retried() {
    let invoker = Scripted::new(vec![Step::Reply("   "), Step::Reply("{}")]);
    let client = ResponseClient::with_invoker(&ai_config(2, 1_000, 10), invoker.clone());

    let reply = client
        .respond(RequestKind::SuggestMissingParameters, "prompt", None)
        .await;

    assert_eq!(reply.text, "{}");
    assert!(!reply.degraded);
    assert_eq!(invoker.call_times().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn single_attempt_policy_never_sleeps() {
    let invoker = Scripted::new(vec![]);
    let client = ResponseClient::with_invoker(&ai_config(1, 1_000, 5_000), invoker.clone());

    let start = Instant::now();
    let reply = client
        .respond(RequestKind::GenerateNodeInsight, "prompt", None)
        .await;

    assert!(reply.degraded);
    assert_eq!(invoker.call_times().len(), 1);
    assert_close(start.elapsed(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_active_attempt() {
    let invoker = Scripted::new(vec![Step::Hang]);
    let client = ResponseClient::with_invoker(&ai_config(3, 60_000, 100), invoker.clone());
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let text = client
        .get_response_cancellable(RequestKind::GenerateReport, "prompt", &token)
        .await;

    assert_eq!(text, degraded_response(RequestKind::GenerateReport));
    assert_eq!(invoker.call_times().len(), 1);
    assert_close(start.elapsed(), 20);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_retrying() {
    let invoker = Scripted::new(vec![]);
    let client = ResponseClient::with_invoker(&ai_config(3, 1_000, 1_000), invoker.clone());
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let reply = client
        .respond(RequestKind::GenerateReport, "prompt", Some(&token))
        .await;

    assert!(reply.degraded);
    assert_eq!(invoker.call_times().len(), 1);
}

#[tokio::test]
async fn mock_mode_never_invokes() {
    let client = ResponseClient::mock();
    assert!(client.is_mock());
    let reply = client
        .respond(RequestKind::SuggestMissingParameters, "prompt", None)
        .await;
    assert!(!reply.degraded);
    assert!(reply.text.contains("recyclingRate"));
}
