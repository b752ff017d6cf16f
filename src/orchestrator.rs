//! Per-kind pipelines: prompt, dispatch, parse and validate, fallback.
//!
//! Once the inputs are known to be well formed nothing here fails: a malformed model
//! answer is replaced by the fallback synthesizer's output and flagged `used_fallback`.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clients::ResponseClient;
use crate::error::Result;
use crate::fallback::{self, Synthesized};
use crate::parser;
use crate::prompts;
use crate::schemas::{
    NodeInsight, OrchestrationResult, ProcessParameters, RecommendationReport, SuggestionSet,
};
use crate::sink::ReportSink;
use crate::stages::Stage;

#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<ResponseClient>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl Orchestrator {
    pub fn new(client: ResponseClient) -> Self {
        Self {
            client: Arc::new(client),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn client(&self) -> &ResponseClient {
        &self.client
    }

    pub(crate) fn sink(&self) -> Option<&Arc<dyn ReportSink>> {
        self.sink.as_ref()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub async fn suggest_missing(
        &self,
        params: &ProcessParameters,
    ) -> OrchestrationResult<SuggestionSet> {
        self.suggest_missing_with_cancel(params, None).await
    }

    pub async fn suggest_missing_with_cancel(
        &self,
        params: &ProcessParameters,
        cancel: Option<&CancellationToken>,
    ) -> OrchestrationResult<SuggestionSet> {
        self.run(params, None, cancel, parser::validate_suggestions).await
    }

    pub async fn generate_report(
        &self,
        params: &ProcessParameters,
    ) -> OrchestrationResult<RecommendationReport> {
        self.generate_report_with_cancel(params, None).await
    }

    pub async fn generate_report_with_cancel(
        &self,
        params: &ProcessParameters,
        cancel: Option<&CancellationToken>,
    ) -> OrchestrationResult<RecommendationReport> {
        self.run(params, None, cancel, |map| parser::validate_report(&map)).await
    }

    pub async fn node_insight(
        &self,
        stage: &Stage,
        params: &ProcessParameters,
    ) -> OrchestrationResult<NodeInsight> {
        self.node_insight_with_cancel(stage, params, None).await
    }

    pub async fn node_insight_with_cancel(
        &self,
        stage: &Stage,
        params: &ProcessParameters,
        cancel: Option<&CancellationToken>,
    ) -> OrchestrationResult<NodeInsight> {
        self.run(params, Some(stage), cancel, |map| parser::validate_node_insight(&map)).await
    }

    /// Shared pipeline; the payload type `T` selects the request kind.
    async fn run<T: Synthesized>(
        &self,
        params: &ProcessParameters,
        stage: Option<&Stage>,
        cancel: Option<&CancellationToken>,
        validate: impl FnOnce(Map<String, Value>) -> Result<T>,
    ) -> OrchestrationResult<T> {
        let kind = T::KIND;
        let prompt = prompts::build(kind, params, stage);
        let reply = self.client.respond(kind, &prompt, cancel).await;
        match parser::parse(&reply.text).and_then(validate) {
            Ok(payload) if reply.degraded => OrchestrationResult::degraded(payload),
            Ok(payload) => {
                debug!(kind = %kind, "model response validated");
                OrchestrationResult::fresh(payload)
            }
            Err(e) => {
                warn!(kind = %kind, "unusable model response, synthesizing fallback: {}", e);
                OrchestrationResult::fallback(fallback::synthesize(params, stage))
            }
        }
    }
}
