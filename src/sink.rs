//! Optional, best-effort report persistence.
//!
//! The orchestrator hands finished reports to a `ReportSink` and only records the
//! returned id. Any sink failure is downgraded to a warning by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::schemas::{ProcessParameters, RecommendationReport};

/// What gets stored for each generated report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub params: ProcessParameters,
    pub report: RecommendationReport,
    pub used_fallback: bool,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Durably store `report`, returning an opaque identifier.
    async fn store(&self, report: &StoredReport) -> Result<String>;
}

/// Writes one pretty-printed JSON file per report: `<dir>/<uuid>.json`
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create reports directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn store(&self, report: &StoredReport) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{id}.json"));
        let bytes = serde_json::to_vec_pretty(report).context("serialize report")?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write report {}", path.display()))?;
        debug!("stored report {} at {}", id, path.display());
        Ok(id)
    }
}
