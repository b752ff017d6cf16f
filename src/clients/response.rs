//! Retrying front-end to the upstream model.
//!
//! One logical call runs up to `max_retries` strictly sequential attempts. Each attempt
//! is bounded by the per-attempt deadline; between attempts the client sleeps
//! `2^attempt` backoff units (never after the last). When every attempt has failed the
//! caller still gets text: a static, kind-aware canned JSON payload. Mock mode returns a
//! different canned payload immediately and never touches the network.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::gemini::GeminiInvoker;
use crate::clients::traits::{InvokeError, ModelInvoker};
use crate::config::AiConfig;
use crate::error::{LcaError, Result};
use crate::schemas::RequestKind;

const MOCK_SUGGESTIONS: &str = r#"{"recyclingRate": 35, "energySource": "Hydroelectric", "transportMode": "Rail", "productLifetime": 25}"#;

const MOCK_REPORT: &str = r#"{"summary": "Mock assessment: the process shows moderate energy intensity with clear potential for higher recycled content.", "recommendations": ["Increase recycled feedstock share", "Switch processing energy to renewable sources", "Recover waste heat from smelting"]}"#;

const MOCK_INSIGHT: &str = r#"{"circularOpportunities": "Mock insight: recover scrap and by-products at this stage and feed them back into production.", "environmentalImpacts": "Mock insight: energy use is the dominant impact at this stage."}"#;

const DEGRADED_SUGGESTIONS: &str = "{}";

const DEGRADED_REPORT: &str = r#"{"summary": "The AI analysis service is temporarily unavailable, so a detailed assessment could not be generated for these parameters.", "recommendations": ["Retry the analysis once the AI service is available", "Review energy sources and recycled content as the usual main levers"]}"#;

const DEGRADED_INSIGHT: &str = r#"{"circularOpportunities": "The AI analysis service is temporarily unavailable; material reuse and by-product recovery are the usual circular levers at this stage.", "environmentalImpacts": "The AI analysis service is temporarily unavailable; energy and resource consumption are the usual main impacts at this stage."}"#;

/// Canned reply used in mock mode.
pub fn mock_response(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::SuggestMissingParameters => MOCK_SUGGESTIONS,
        RequestKind::GenerateReport => MOCK_REPORT,
        RequestKind::GenerateNodeInsight => MOCK_INSIGHT,
    }
}

/// Canned reply used once all attempts have failed.
pub fn degraded_response(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::SuggestMissingParameters => DEGRADED_SUGGESTIONS,
        RequestKind::GenerateReport => DEGRADED_REPORT,
        RequestKind::GenerateNodeInsight => DEGRADED_INSIGHT,
    }
}

/// Result of a single dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAttemptOutcome {
    Success(String),
    TransientFailure(String),
    Timeout,
}

impl ClientAttemptOutcome {
    /// Reply text, or the failed attempt as a transient or timeout error.
    pub fn into_result(self, timeout: Duration) -> Result<String> {
        match self {
            ClientAttemptOutcome::Success(text) => Ok(text),
            ClientAttemptOutcome::TransientFailure(message) => {
                Err(LcaError::TransientService { message })
            }
            ClientAttemptOutcome::Timeout => Err(LcaError::Timeout {
                operation: "model request".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Raw text handed to the parser, tagged with whether it is the degraded canned reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub degraded: bool,
}

enum Mode {
    Mock,
    Live(Arc<dyn ModelInvoker>),
}

pub struct ResponseClient {
    mode: Mode,
    max_retries: u32,
    per_attempt_timeout: Duration,
    backoff_unit: Duration,
}

impl ResponseClient {
    /// Client for `cfg`: mock when mock mode is on, otherwise the Gemini invoker.
    pub fn from_config(cfg: &AiConfig) -> Result<Self> {
        if cfg.mock_mode {
            return Ok(Self::mock());
        }
        let invoker = GeminiInvoker::new(cfg)?;
        Ok(Self::with_invoker(cfg, Arc::new(invoker)))
    }

    pub fn with_invoker(cfg: &AiConfig, invoker: Arc<dyn ModelInvoker>) -> Self {
        Self {
            mode: Mode::Live(invoker),
            max_retries: cfg.max_retries.max(1),
            per_attempt_timeout: cfg.per_attempt_timeout(),
            backoff_unit: cfg.backoff_unit(),
        }
    }

    pub fn mock() -> Self {
        let defaults = AiConfig::default();
        Self {
            mode: Mode::Mock,
            max_retries: defaults.max_retries,
            per_attempt_timeout: defaults.per_attempt_timeout(),
            backoff_unit: defaults.backoff_unit(),
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay slept after failed attempt `attempt` (0-based) when another attempt follows.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(1u32 << attempt.min(16))
    }

    /// One attempt under the per-attempt deadline.
    pub async fn dispatch(&self, kind: RequestKind, prompt: &str) -> ClientAttemptOutcome {
        let invoker = match &self.mode {
            Mode::Mock => return ClientAttemptOutcome::Success(mock_response(kind).to_string()),
            Mode::Live(invoker) => invoker,
        };

        let deadline = self.per_attempt_timeout;
        match tokio::time::timeout(deadline, invoker.invoke(prompt, deadline)).await {
            Err(_) | Ok(Err(InvokeError::Timeout { .. })) => ClientAttemptOutcome::Timeout,
            Ok(Err(e)) => ClientAttemptOutcome::TransientFailure(e.to_string()),
            Ok(Ok(text)) if text.trim().is_empty() => {
                ClientAttemptOutcome::TransientFailure(InvokeError::EmptyResponse.to_string())
            }
            Ok(Ok(text)) => ClientAttemptOutcome::Success(text),
        }
    }

    /// Raw model text for `prompt`, after retries. Never fails.
    pub async fn get_response(&self, kind: RequestKind, prompt: &str) -> String {
        self.respond(kind, prompt, None).await.text
    }

    /// Like `get_response`, but aborts the active attempt or backoff when `cancel` fires.
    /// A cancelled call yields the degraded canned reply.
    pub async fn get_response_cancellable(
        &self,
        kind: RequestKind,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> String {
        self.respond(kind, prompt, Some(cancel)).await.text
    }

    pub async fn respond(
        &self,
        kind: RequestKind,
        prompt: &str,
        cancel: Option<&CancellationToken>,
    ) -> ModelReply {
        if self.is_mock() {
            debug!("mock mode: returning canned {} response", kind);
            return ModelReply {
                text: mock_response(kind).to_string(),
                degraded: false,
            };
        }

        debug!(kind = %kind, prompt_chars = prompt.len(), "dispatching prompt");
        for attempt in 0..self.max_retries {
            let outcome = tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    warn!(kind = %kind, attempt = attempt + 1, "request cancelled during attempt");
                    return degraded(kind);
                }
                outcome = self.dispatch(kind, prompt) => outcome,
            };

            match outcome.into_result(self.per_attempt_timeout) {
                Ok(text) => {
                    info!(
                        kind = %kind,
                        attempt = attempt + 1,
                        response_chars = text.len(),
                        "model responded"
                    );
                    return ModelReply {
                        text,
                        degraded: false,
                    };
                }
                Err(err) => warn!(
                    kind = %kind,
                    attempt = attempt + 1,
                    max_retries = self.max_retries,
                    "model call failed: {}",
                    err
                ),
            }

            if attempt + 1 < self.max_retries {
                let delay = self.backoff_delay(attempt);
                debug!("retrying in {}ms", delay.as_millis());
                tokio::select! {
                    biased;
                    _ = cancelled(cancel) => {
                        warn!(kind = %kind, "request cancelled during backoff");
                        return degraded(kind);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        error!(
            kind = %kind,
            "model unavailable after {} attempts, returning canned response",
            self.max_retries
        );
        degraded(kind)
    }
}

fn degraded(kind: RequestKind) -> ModelReply {
    ModelReply {
        text: degraded_response(kind).to_string(),
        degraded: true,
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}
