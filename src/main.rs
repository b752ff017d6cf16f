use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lca_insight::config::{self, Config};
use lca_insight::http::{self, HttpState};

#[derive(Parser)]
#[command(name = "lca-insight")]
#[command(about = "AI-assisted life-cycle assessment insight service", long_about = None)]
struct Cli {
    /// Path to the TOML config file (defaults to LCA_CONFIG or lca_insight.toml)
    #[arg(long)]
    config: Option<String>,
    /// Address to listen on, overriding the config file
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Serve canned responses without calling the model
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::load_env_files();

    if std::env::var("LCA_NO_LOG").as_deref() != Ok("1") {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("lca_insight=info,tower_http=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let mut config = Config::load_from(&config_path, |key| match key {
        "LCA_AI_MOCK_MODE" if cli.mock => Some("true".to_string()),
        _ => std::env::var(key).ok(),
    })
    .with_context(|| format!("loading configuration from {}", config_path))?;
    if let Some(bind) = cli.bind {
        config.http.bind = bind;
    }

    info!(
        model = %config.ai.model,
        mock_mode = config.ai.mock_mode,
        max_retries = config.ai.max_retries,
        "starting lca-insight"
    );

    let orchestrator =
        lca_insight::build_orchestrator(&config).context("building model client")?;
    let bind = config.http.bind;
    let state = HttpState {
        config: Arc::new(config),
        orchestrator: Arc::new(orchestrator),
    };
    http::serve(state, bind).await
}
