//! Operations exposed to the request boundary.
//!
//! Inputs arrive as already-deserialized JSON fields. Missing or malformed inputs are
//! the only hard failure (`InvalidRequest`). Everything else produces a schema-valid
//! payload, annotated with `warning` when it is degraded or could not be saved.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

use crate::error::{LcaError, Result};
use crate::orchestrator::Orchestrator;
use crate::schemas::{
    NodeInsight, OrchestrationResult, ProcessParameters, RecommendationReport, SuggestionSet,
};
use crate::sink::StoredReport;
use crate::stages::Stage;

/// Body of the suggestion and report endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsRequest {
    #[serde(default)]
    pub params: Option<Value>,
}

/// Body of the node-insight endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInsightRequest {
    #[serde(default)]
    pub node_id: Option<Value>,
    #[serde(default)]
    pub stage: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub success: bool,
    pub suggestions: SuggestionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success: bool,
    pub report: RecommendationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightResponse {
    pub success: bool,
    pub insights: NodeInsight,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Orchestrator {
    pub async fn suggest_parameters(&self, params: Option<&Value>) -> Result<SuggestResponse> {
        let params = ProcessParameters::from_value(params)?;
        let result = self.suggest_missing(&params).await;
        let warning = join_warnings(result_notes(&result, "parameter suggestions"));
        Ok(SuggestResponse {
            success: true,
            suggestions: result.payload,
            warning,
        })
    }

    pub async fn generate_recommendations(&self, params: Option<&Value>) -> Result<ReportResponse> {
        let params = ProcessParameters::from_value(params)?;
        let result = self.generate_report(&params).await;
        let mut notes = result_notes(&result, "report");

        let mut report_id = None;
        if let Some(sink) = self.sink() {
            let stored = StoredReport {
                params,
                report: result.payload.clone(),
                used_fallback: result.used_fallback,
                degraded: result.degraded,
                created_at: Utc::now(),
            };
            match sink.store(&stored).await {
                Ok(id) => {
                    info!(report_id = %id, "report persisted");
                    report_id = Some(id);
                }
                Err(e) => {
                    warn!("report persistence failed: {:#}", e);
                    notes.push(format!("report generated but could not be saved: {}", e));
                }
            }
        }

        Ok(ReportResponse {
            success: true,
            report: result.payload,
            report_id,
            warning: join_warnings(notes),
        })
    }

    pub async fn get_node_insight(
        &self,
        node_id: Option<&Value>,
        stage: Option<&Value>,
        params: Option<&Value>,
    ) -> Result<InsightResponse> {
        let node_id = required_text(node_id, "nodeId")?;
        let stage = Stage::parse(&required_text(stage, "stage")?);
        let params = ProcessParameters::from_value(params)?;

        let span = info_span!("node_insight", node_id = %node_id, stage = %stage);
        let result = self.node_insight(&stage, &params).instrument(span).await;
        let warning = join_warnings(result_notes(&result, "insight"));
        Ok(InsightResponse {
            success: true,
            insights: result.payload,
            warning,
        })
    }
}

fn result_notes<T>(result: &OrchestrationResult<T>, what: &str) -> Vec<String> {
    let mut notes = Vec::new();
    if result.used_fallback {
        notes.push(format!(
            "AI response could not be parsed; returned a generated fallback {}",
            what
        ));
    }
    if result.degraded {
        notes.push(format!(
            "AI service unavailable after retries; returned a generic placeholder {}",
            what
        ));
    }
    notes
}

/// Each condition stays its own sentence so callers can see every cause.
fn join_warnings(notes: Vec<String>) -> Option<String> {
    (!notes.is_empty()).then(|| notes.join("; "))
}

/// Non-empty string (numbers are accepted and stringified) or `InvalidRequest`.
fn required_text(value: Option<&Value>, field: &str) -> Result<String> {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(LcaError::invalid_request(format!(
            "{} is required and must be a non-empty string",
            field
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_text_rules() {
        assert_eq!(required_text(Some(&json!(" n1 ")), "nodeId").unwrap(), "n1");
        assert_eq!(required_text(Some(&json!(7)), "nodeId").unwrap(), "7");
        assert!(required_text(Some(&json!("")), "nodeId").is_err());
        assert!(required_text(Some(&json!({})), "stage").is_err());
        assert!(required_text(None, "stage").is_err());
    }

    #[test]
    fn warnings_keep_each_cause() {
        assert_eq!(join_warnings(vec![]), None);
        let joined = join_warnings(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(joined, "a; b");
    }
}
