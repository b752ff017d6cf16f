use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LcaError, Result};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MAX_RETRIES_CAP: u32 = 10;

/// Main configuration structure loaded from lca_insight.toml and environment variables.
///
/// Built once at startup and shared read-only (behind an `Arc`) by every request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
}

/// Upstream model client and retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiConfig {
    /// Never read from or written to the TOML file; environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub mock_mode: bool,
    pub max_retries: u32,
    pub timeout_ms: u64,
    /// Length of one backoff unit; the delay before attempt n+1 is 2^n units.
    pub backoff_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            mock_mode: false,
            max_retries: 3,
            timeout_ms: 15_000,
            backoff_ms: 1_000,
        }
    }
}

impl AiConfig {
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Clamp soft limits and reject settings the service cannot start with.
    pub fn validate(&mut self) -> Result<()> {
        if self.max_retries == 0 {
            tracing::warn!("max_retries 0 is not allowed, using 1");
            self.max_retries = 1;
        } else if self.max_retries > MAX_RETRIES_CAP {
            tracing::warn!(
                "max_retries {} exceeds max {}, clamping",
                self.max_retries,
                MAX_RETRIES_CAP
            );
            self.max_retries = MAX_RETRIES_CAP;
        }
        if self.timeout_ms == 0 {
            return Err(LcaError::configuration("timeout_ms must be greater than 0"));
        }
        if !self.mock_mode && self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(LcaError::configuration(
                "GEMINI_API_KEY is required unless mock mode is enabled (LCA_AI_MOCK_MODE=true)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
        }
    }
}

/// Optional report persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub persist_reports: bool,
    /// Defaults to the platform data directory when unset.
    pub reports_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist_reports: true,
            reports_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn resolved_reports_dir(&self) -> Option<PathBuf> {
        self.reports_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("lca-insight").join("reports")))
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses LCA_CONFIG environment variable or defaults to "lca_insight.toml".
    pub fn load() -> Result<Self> {
        load_env_files();
        Self::load_from(&default_config_path(), |key| std::env::var(key).ok())
    }

    /// Load from an explicit file path with a custom environment lookup.
    pub fn load_from(
        config_path: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config: Config = match std::fs::read_to_string(config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(_) => {
                tracing::warn!("Config file {} not found, using defaults", config_path);
                Self::default()
            }
        };
        config.apply_env(env);
        config.ai.validate()?;
        Ok(config)
    }

    /// Environment overrides (env-first)
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(key) = env("GEMINI_API_KEY").or_else(|| env("GOOGLE_API_KEY")) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = env("LCA_AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(url) = env("LCA_AI_BASE_URL") {
            self.ai.base_url = url;
        }
        if let Some(mock) = env("LCA_AI_MOCK_MODE") {
            self.ai.mock_mode = is_truthy(&mock);
        }
        if let Some(retries) = env("LCA_AI_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.ai.max_retries = retries;
        }
        if let Some(timeout) = env("LCA_AI_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.ai.timeout_ms = timeout;
        }
        if let Some(backoff) = env("LCA_AI_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            self.ai.backoff_ms = backoff;
        }
        if let Some(v) = env("LCA_HTTP_BIND") {
            match v.parse::<SocketAddr>() {
                Ok(bind) => self.http.bind = bind,
                Err(_) => tracing::warn!("Ignoring invalid LCA_HTTP_BIND '{}'", v),
            }
        }
        if let Some(persist) = env("LCA_PERSIST_REPORTS") {
            self.storage.persist_reports = is_truthy(&persist);
        }
        if let Some(dir) = env("LCA_REPORTS_DIR") {
            self.storage.reports_dir = Some(PathBuf::from(dir));
        }
    }
}

/// Load `.env` (or the file named by LCA_ENV_FILE); missing files are ignored.
pub fn load_env_files() {
    if let Ok(env_path) = std::env::var("LCA_ENV_FILE") {
        let _ = dotenvy::from_path(env_path);
    } else {
        let _ = dotenvy::dotenv();
    }
}

pub fn default_config_path() -> String {
    std::env::var("LCA_CONFIG").unwrap_or_else(|_| "lca_insight.toml".to_string())
}

fn is_truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}
