pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod schemas;
pub mod sink;
pub mod stages;

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::ResponseClient;
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::sink::JsonFileSink;

/// Wire the response client and (optionally) the report sink from `config`.
///
/// A reports directory that cannot be created is logged and persistence is disabled;
/// it never prevents startup.
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let client = ResponseClient::from_config(&config.ai)?;
    let mut orchestrator = Orchestrator::new(client);

    if config.storage.persist_reports {
        match config.storage.resolved_reports_dir() {
            Some(dir) => match JsonFileSink::open(&dir) {
                Ok(sink) => {
                    info!("persisting reports to {}", dir.display());
                    orchestrator = orchestrator.with_sink(Arc::new(sink));
                }
                Err(e) => warn!("report persistence disabled: {:#}", e),
            },
            None => warn!("no data directory available, report persistence disabled"),
        }
    }

    Ok(orchestrator)
}
