//! Recovery of structured objects from raw model text, plus per-kind schema checks.
//!
//! Models wrap JSON in code fences, prepend chatty prose, or append notes. `parse`
//! tries a strict parse, drops fence lines and tries again, then falls back to the
//! outermost brace span and finally to each balanced `{...}` candidate in order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LcaError, Result};
use crate::schemas::{
    NodeInsight, ParamValue, RecommendationReport, SuggestionSet, is_candidate_parameter,
};

// Fence markers only count when they sit on their own line; JSON strings cannot span lines.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+-]*[ \t]*\r?$").expect("fence regex should compile")
});

const SUMMARY_KEYS: &[&str] = &[
    "summary",
    "lca_summary",
    "lcaSummary",
    "executiveSummary",
    "executive_summary",
];
const RECOMMENDATION_ITEM_KEYS: &[&str] = &["recommendation", "text", "action"];
const CIRCULAR_KEYS: &[&str] = &["circularOpportunities", "circular_opportunities"];
const IMPACT_KEYS: &[&str] = &["environmentalImpacts", "environmental_impacts"];

/// Remove code-fence lines (with an optional language tag) and trim.
pub fn strip_fences(raw: &str) -> String {
    FENCE_RE.replace_all(raw, "").trim().to_string()
}

/// Recover a single JSON object from `raw`.
pub fn parse(raw: &str) -> Result<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(map);
    }

    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return Err(LcaError::malformed("empty response"));
    }

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => {
            return Err(LcaError::malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )));
        }
        Err(e) => debug!("strict parse failed ({}), scanning for embedded object", e),
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}'))
        && start < end
        && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned[start..=end])
    {
        return Ok(map);
    }

    for candidate in extract_json_candidates(&cleaned) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&candidate) {
            debug!("recovered object from balanced candidate");
            return Ok(map);
        }
    }

    Err(LcaError::malformed(format!(
        "no valid JSON object found in response: {}",
        truncate_chars(&cleaned, 200)
    )))
}

/// Suggestions: any object is acceptable; entries outside the candidate list or with
/// non-scalar values are dropped. A lone `{"suggestions": {...}}` wrapper is unwrapped.
pub fn validate_suggestions(map: Map<String, Value>) -> Result<SuggestionSet> {
    let wrapped = map.len() == 1 && matches!(map.get("suggestions"), Some(Value::Object(_)));
    let map = if wrapped {
        match map.into_iter().next() {
            Some((_, Value::Object(inner))) => inner,
            _ => Map::new(),
        }
    } else {
        map
    };
    let suggestions = map
        .iter()
        .filter(|(k, _)| is_candidate_parameter(k))
        .filter_map(|(k, v)| ParamValue::from_json(v).map(|pv| (k.clone(), pv)))
        .collect::<SuggestionSet>();
    if suggestions.len() < map.len() {
        debug!(
            "dropped {} suggestion entries outside the candidate list",
            map.len() - suggestions.len()
        );
    }
    Ok(suggestions)
}

pub fn validate_report(map: &Map<String, Value>) -> Result<RecommendationReport> {
    let summary = first_text(map, SUMMARY_KEYS)
        .ok_or_else(|| LcaError::malformed("report is missing a non-empty summary"))?;
    let items = map
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or_else(|| LcaError::malformed("report is missing a recommendations list"))?;
    let recommendations: Vec<String> = items.iter().filter_map(recommendation_text).collect();
    if recommendations.is_empty() {
        return Err(LcaError::malformed("report recommendations list is empty"));
    }
    Ok(RecommendationReport {
        summary,
        recommendations,
    })
}

pub fn validate_node_insight(map: &Map<String, Value>) -> Result<NodeInsight> {
    let circular_opportunities = first_text(map, CIRCULAR_KEYS)
        .ok_or_else(|| LcaError::malformed("insight is missing circularOpportunities"))?;
    let environmental_impacts = first_text(map, IMPACT_KEYS)
        .ok_or_else(|| LcaError::malformed("insight is missing environmentalImpacts"))?;
    Ok(NodeInsight {
        circular_opportunities,
        environmental_impacts,
    })
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn recommendation_text(item: &Value) -> Option<String> {
    let text = match item {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => first_text(obj, RECOMMENDATION_ITEM_KEYS)?,
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn extract_json_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0
                        && let Some(s) = start.take()
                    {
                        candidates.push(text[s..idx + 1].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    candidates
}

pub(crate) fn truncate_chars(input: &str, max: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in input.chars().enumerate() {
        if idx >= max {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}
