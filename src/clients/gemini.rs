use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::clients::traits::{InvokeError, ModelInvoker};
use crate::config::AiConfig;
use crate::error::{LcaError, Result};
use crate::parser::truncate_chars;

const ERROR_BODY_CAP_CHARS: usize = 500;

/// Generative Language API client (`models/{model}:generateContent`)
#[derive(Clone)]
pub struct GeminiInvoker {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponseContent {
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GeminiInvoker {
    pub fn new(cfg: &AiConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LcaError::configuration("GEMINI_API_KEY not set"))?;

        // Per-request deadlines are applied in `invoke`; this only bounds connection setup.
        let client = Client::builder()
            .connect_timeout(cfg.per_attempt_timeout())
            .build()
            .map_err(|e| LcaError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            cfg.base_url.trim_end_matches('/'),
            cfg.model
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelInvoker for GeminiInvoker {
    async fn invoke(&self, prompt: &str, deadline: Duration) -> std::result::Result<String, InvokeError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .timeout(deadline)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeError::Timeout {
                        timeout_ms: deadline.as_millis() as u64,
                    }
                } else {
                    InvokeError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body: truncate_chars(body_text.trim(), ERROR_BODY_CAP_CHARS),
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| InvokeError::Decode(e.to_string()))?;
        extract_text(&parsed).ok_or(InvokeError::EmptyResponse)
    }
}

/// Concatenated text parts of the first candidate, if any are non-blank.
pub fn extract_text(resp: &GenerateResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}
