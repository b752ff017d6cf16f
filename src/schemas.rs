//! Data model shared by the orchestration pipeline.
//!
//! Process parameters arrive as an open, loosely-typed bag of attributes. They are
//! modelled as an ordered map with a small closed set of scalar value kinds so the
//! prompt dump is deterministic and fallback templates can read values by name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{LcaError, Result};

/// Parameter names the model may propose for `SuggestMissingParameters`.
pub const CANDIDATE_PARAMETERS: &[&str] = &[
    "metalType",
    "oreGrade",
    "miningLocation",
    "landUse",
    "energyConsumptionMining",
    "waterConsumptionMining",
    "processingMethod",
    "energySource",
    "energyConsumptionProcessing",
    "emissionsProcessing",
    "waterConsumptionProcessing",
    "manufacturingProcess",
    "materialEfficiency",
    "energyConsumptionManufacturing",
    "wasteGenerated",
    "transportMode",
    "transportDistance",
    "packagingType",
    "fuelType",
    "productLifetime",
    "usePhaseEnergy",
    "maintenanceFrequency",
    "recyclingRate",
    "endOfLifeTreatment",
    "recoveryEfficiency",
    "scrapQuality",
];

pub fn is_candidate_parameter(name: &str) -> bool {
    CANDIDATE_PARAMETERS.contains(&name)
}

/// A single process attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
}

impl ParamValue {
    /// Convert a JSON value; nulls, arrays and nested objects are not parameter values.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ParamValue::Flag(*b)),
            Value::Number(n) => Some(ParamValue::Number(n.clone())),
            Value::String(s) => Some(ParamValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => n.as_f64(),
            ParamValue::Text(s) => s.trim().parse::<f64>().ok(),
            ParamValue::Flag(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(b) => write!(f, "{}", b),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v)
            .map(ParamValue::Number)
            .unwrap_or_else(|| ParamValue::Text(v.to_string()))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Number(v.into())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Flag(v)
    }
}

/// Process-parameter data supplied by the request boundary. Read-only to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessParameters(BTreeMap<String, ParamValue>);

impl ProcessParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an already-deserialized request field.
    ///
    /// Fails with `InvalidRequest` when the value is missing, null or not an object.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            Some(Value::Object(map)) => Ok(Self::from_map(map)),
            Some(Value::Null) | None => Err(LcaError::invalid_request("params is required")),
            Some(_) => Err(LcaError::invalid_request("params must be an object")),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self(
            map.iter()
                .filter_map(|(k, v)| ParamValue::from_json(v).map(|pv| (k.clone(), pv)))
                .collect(),
        )
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    /// Non-empty textual rendering of a parameter, whatever its kind
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|v| v.to_string())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Subset of these parameters restricted to `keys`; absent keys are omitted.
    pub fn narrowed(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Readable structured dump used inside prompts
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Which orchestration pipeline a request runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    SuggestMissingParameters,
    GenerateReport,
    GenerateNodeInsight,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::SuggestMissingParameters => "suggest_missing_parameters",
            RequestKind::GenerateReport => "generate_report",
            RequestKind::GenerateNodeInsight => "generate_node_insight",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested values keyed by parameter name. May be empty.
pub type SuggestionSet = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub summary: String,
    pub recommendations: Vec<String>,
}

impl RecommendationReport {
    pub fn is_valid(&self) -> bool {
        !self.summary.trim().is_empty()
            && !self.recommendations.is_empty()
            && self.recommendations.iter().all(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInsight {
    pub circular_opportunities: String,
    pub environmental_impacts: String,
}

impl NodeInsight {
    pub fn is_valid(&self) -> bool {
        !self.circular_opportunities.trim().is_empty()
            && !self.environmental_impacts.trim().is_empty()
    }
}

/// Outcome of one orchestrated request; built once and handed back to the caller.
///
/// `used_fallback` marks a payload produced by the fallback synthesizer after the model's
/// answer could not be parsed. `degraded` marks a payload built from the static canned
/// response the client returns once every retry has failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult<T> {
    pub payload: T,
    pub used_fallback: bool,
    pub degraded: bool,
}

impl<T> OrchestrationResult<T> {
    pub fn fresh(payload: T) -> Self {
        Self {
            payload,
            used_fallback: false,
            degraded: false,
        }
    }

    pub fn fallback(payload: T) -> Self {
        Self {
            payload,
            used_fallback: true,
            degraded: false,
        }
    }

    pub fn degraded(payload: T) -> Self {
        Self {
            payload,
            used_fallback: false,
            degraded: true,
        }
    }
}
