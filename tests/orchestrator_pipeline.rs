//! End-to-end behaviour of the three request pipelines against a scripted model.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use lca_insight::clients::{InvokeError, ModelInvoker, ResponseClient};
use lca_insight::config::AiConfig;
use lca_insight::error::LcaError;
use lca_insight::orchestrator::Orchestrator;
use lca_insight::schemas::{ParamValue, ProcessParameters, is_candidate_parameter};
use lca_insight::sink::{JsonFileSink, ReportSink, StoredReport};
use lca_insight::stages::Stage;

/// Answers every call with the same text (or error) and counts calls.
struct Fixed {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl Fixed {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelInvoker for Fixed {
    async fn invoke(&self, _prompt: &str, _deadline: Duration) -> Result<String, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| InvokeError::Transport("connection refused".into()))
    }
}

struct BrokenSink;

#[async_trait]
impl ReportSink for BrokenSink {
    async fn store(&self, _report: &StoredReport) -> anyhow::Result<String> {
        anyhow::bail!("disk full")
    }
}

fn orchestrator(invoker: Arc<Fixed>) -> Orchestrator {
    let cfg = AiConfig {
        max_retries: 3,
        timeout_ms: 1_000,
        backoff_ms: 1,
        ..AiConfig::default()
    };
    Orchestrator::new(ResponseClient::with_invoker(&cfg, invoker))
}

#[tokio::test]
async fn mock_suggestions_are_returned_unchanged() {
    let orch = Orchestrator::new(ResponseClient::mock());
    let params = ProcessParameters::new()
        .with("metalType", "Copper")
        .with("oreGrade", 0.5);

    let result = orch.suggest_missing(&params).await;

    assert!(!result.used_fallback);
    assert!(!result.degraded);
    assert_eq!(result.payload.len(), 4);
    assert_eq!(result.payload.get("recyclingRate"), Some(&ParamValue::from(35_i64)));
    assert_eq!(
        result.payload.get("energySource"),
        Some(&ParamValue::from("Hydroelectric"))
    );
}

#[tokio::test]
async fn fenced_report_with_summary_alias_is_accepted() {
    let raw = "Sure! Here is the data:\n```json\n{\"lca_summary\":\"Copper smelting dominates.\",\"recommendations\":[\"a\",\"b\"]}\n```";
    let invoker = Fixed::replying(raw);
    let orch = orchestrator(invoker.clone());

    let result = orch
        .generate_report(&ProcessParameters::new().with("metalType", "Copper"))
        .await;

    assert!(!result.used_fallback);
    assert_eq!(result.payload.summary, "Copper smelting dominates.");
    assert_eq!(result.payload.recommendations, vec!["a", "b"]);
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn refusal_falls_back_to_report_naming_metal() {
    let invoker = Fixed::replying("I cannot comply.");
    let orch = orchestrator(invoker.clone());

    let result = orch
        .generate_report(&ProcessParameters::new().with("metalType", "Aluminium"))
        .await;

    assert!(result.used_fallback);
    assert!(result.payload.is_valid());
    assert!(result.payload.summary.contains("Aluminium"));
    // Malformed output is not retried against the network.
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn processing_fallback_names_fossil_source() {
    let invoker = Fixed::replying("no json here");
    let orch = orchestrator(invoker);
    let params = ProcessParameters::new()
        .with("energySource", "coal")
        .with("metalType", "Steel");

    let result = orch.node_insight(&Stage::parse("Processing"), &params).await;

    assert!(result.used_fallback);
    assert!(result.payload.is_valid());
    assert!(
        result
            .payload
            .environmental_impacts
            .contains("transitioning away from coal")
    );
}

#[tokio::test]
async fn exhausted_retries_yield_degraded_but_valid_payloads() {
    let invoker = Fixed::failing();
    let orch = orchestrator(invoker.clone());
    let params = ProcessParameters::new().with("metalType", "Zinc");

    let report = orch.generate_report(&params).await;
    assert!(report.degraded);
    assert!(!report.used_fallback);
    assert!(report.payload.is_valid());
    assert_eq!(invoker.calls(), 3);

    let insight = orch.node_insight(&Stage::EndOfLife, &params).await;
    assert!(insight.degraded);
    assert!(insight.payload.is_valid());

    let suggestions = orch.suggest_missing(&params).await;
    assert!(suggestions.degraded);
    assert!(suggestions.payload.is_empty());
}

#[tokio::test]
async fn suggestions_keep_only_candidate_names() {
    let invoker = Fixed::replying(
        r#"{"recyclingRate": 40, "favouriteColour": "blue", "transportMode": "Ship", "nested": {"x": 1}}"#,
    );
    let orch = orchestrator(invoker);

    let result = orch.suggest_missing(&ProcessParameters::new()).await;

    assert!(!result.used_fallback);
    assert!(result.payload.keys().all(|k| is_candidate_parameter(k)));
    assert_eq!(result.payload.len(), 2);
}

#[tokio::test]
async fn invalid_input_fails_before_dispatch() {
    let invoker = Fixed::replying("{}");
    let orch = orchestrator(invoker.clone());

    let err = orch.suggest_parameters(None).await.unwrap_err();
    assert!(matches!(err, LcaError::InvalidRequest { .. }));

    let err = orch
        .generate_recommendations(Some(&json!("Copper")))
        .await
        .unwrap_err();
    assert!(matches!(err, LcaError::InvalidRequest { .. }));

    let err = orch
        .get_node_insight(None, Some(&json!("Processing")), Some(&json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LcaError::InvalidRequest { .. }));

    let err = orch
        .get_node_insight(Some(&json!("n1")), Some(&json!("")), Some(&json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LcaError::InvalidRequest { .. }));

    assert_eq!(invoker.calls(), 0);
}

#[tokio::test]
async fn sink_failure_becomes_warning() {
    let invoker = Fixed::replying(r#"{"summary":"ok","recommendations":["r1"]}"#);
    let orch = orchestrator(invoker).with_sink(Arc::new(BrokenSink));

    let resp = orch
        .generate_recommendations(Some(&json!({"metalType": "Nickel"})))
        .await
        .unwrap();

    assert!(resp.success);
    assert!(resp.report_id.is_none());
    let warning = resp.warning.unwrap();
    assert!(warning.contains("could not be saved"));
    assert!(warning.contains("disk full"));
}

#[tokio::test]
async fn fallback_and_sink_failure_are_both_reported() {
    let invoker = Fixed::replying("garbage");
    let orch = orchestrator(invoker).with_sink(Arc::new(BrokenSink));

    let resp = orch
        .generate_recommendations(Some(&json!({"metalType": "Nickel"})))
        .await
        .unwrap();

    let warning = resp.warning.unwrap();
    assert!(warning.contains("fallback"));
    assert!(warning.contains("could not be saved"));
}

#[tokio::test]
async fn persisted_report_returns_id() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::open(dir.path()).unwrap();
    let invoker = Fixed::replying(r#"{"summary":"ok","recommendations":["r1"]}"#);
    let orch = orchestrator(invoker).with_sink(Arc::new(sink));

    let resp = orch
        .generate_recommendations(Some(&json!({"metalType": "Nickel", "recyclingRate": 20})))
        .await
        .unwrap();

    assert!(resp.warning.is_none());
    let id = resp.report_id.unwrap();
    let stored = std::fs::read_to_string(dir.path().join(format!("{id}.json"))).unwrap();
    let stored: StoredReport = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored.report, resp.report);
    assert_eq!(stored.params.text("metalType").as_deref(), Some("Nickel"));
}

#[tokio::test]
async fn node_insight_response_without_warning_when_model_answers() {
    let invoker = Fixed::replying(
        r#"{"circularOpportunities":"Reuse slag.","environmentalImpacts":"High energy use."}"#,
    );
    let orch = orchestrator(invoker);

    let resp = orch
        .get_node_insight(
            Some(&json!("node-7")),
            Some(&json!("processing")),
            Some(&json!({"energySource": "Solar"})),
        )
        .await
        .unwrap();

    assert!(resp.success);
    assert!(resp.warning.is_none());
    assert_eq!(resp.insights.circular_opportunities, "Reuse slag.");
}
