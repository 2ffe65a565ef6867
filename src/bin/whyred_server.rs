//! Whyred backend server.
//!
//! Usage:
//!   whyred-server            Read configuration from the environment (and `.env`) and serve
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use whyred_backend::config::AppConfig;
use whyred_backend::server::{self, ServerState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("loaded environment from {}", path.display());
    }
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = config.socket_addr().context("invalid listen address")?;
    info!(
        models = ?config.models.model_set(whyred_backend::RequestType::Text).models(),
        max_attempts = config.retry.max_attempts(),
        origins = ?config.allowed_origins,
        "starting whyred backend"
    );

    let state = ServerState::from_config(&config)
        .context("failed to build service graph")?
        .into_shared();
    server::serve(state, addr).await?;
    Ok(())
}
