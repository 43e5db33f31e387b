//! Opens a NAT-PMP port mapping, publishes the external TCP port to the
//! torrent client and exits non-zero when no download makes progress.
//!
//! Usage: `torrent-warden [CONFIG]`
//!
//! The only argument is an optional path to a TOML config file. Without it,
//! `config.toml` in the working directory is read when present, otherwise
//! built-in defaults are used: gateway `10.2.0.1`, client API at
//! `http://localhost:8080`, internal port 1, 300 s lease. `RUST_LOG`
//! overrides the configured log level. There are no other flags or
//! environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};

use torrent_warden::api::client::ApiClient;
use torrent_warden::core::config::Config;
use torrent_warden::core::orchestrator::{self, RunSettings};
use torrent_warden::core::tracing_init::init_tracing;
use torrent_warden::natpmp::NatPmpClient;

fn main() -> Result<()> {
    let config_path = env::args().nth(1).map(PathBuf::from);

    let (config, loaded_from) = Config::load(config_path)
        .context("Failed to load configuration")?;

    // Initialize tracing/logging
    init_tracing(&config.logging)?;

    // One-shot and strictly sequential, a single thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, loaded_from))
}

async fn async_main(config: Config, loaded_from: Option<PathBuf>) -> Result<()> {
    info!(
        config_path = ?loaded_from.as_ref().map(|path| path.display().to_string()),
        gateway = %config.natpmp.gateway,
        endpoint = %config.client.endpoint,
        "torrent-warden starting"
    );

    let gateway = config.natpmp.resolve_gateway()?;
    let mapper = NatPmpClient::new(gateway)
        .with_retransmission(config.natpmp.initial_timeout(), config.natpmp.attempts);

    let mut api_client = ApiClient::new(config.client.endpoint.clone(), config.client.timeout())
        .context("Failed to create API client")?;
    if let Some((username, password)) = config.client.credentials() {
        api_client = api_client.with_credentials(username.to_string(), password.to_string());
    }

    let settings = RunSettings::from(&config);
    match orchestrator::run(&mapper, &api_client, &settings).await {
        Ok(report) => {
            info!(torrents = report.assessments.len(), "Check completed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Check failed");
            Err(e.into())
        }
    }
}
