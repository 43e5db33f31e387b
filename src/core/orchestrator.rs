use std::time::Duration;
use tracing::{error, info};

use crate::api::{TorrentApi, DOWNLOADING_FILTER};
use crate::core::config::Config;
use crate::core::error::RunError;
use crate::health::{self, HealthReport};
use crate::natpmp::{PortMapper, PortMapping, Protocol};
use crate::utils::time::current_timestamp;

/// Parameters of a single run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub internal_port: u16,
    pub lease_seconds: u32,
    pub activity_window: Duration,
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            internal_port: config.natpmp.internal_port,
            lease_seconds: config.natpmp.lease_seconds,
            activity_window: config.health.activity_window(),
        }
    }
}

async fn map_port<M: PortMapper>(
    mapper: &M,
    protocol: Protocol,
    settings: &RunSettings,
) -> Result<PortMapping, RunError> {
    let mapping = mapper
        .request_mapping(protocol, settings.internal_port, settings.lease_seconds)
        .await
        .map_err(|source| RunError::Mapping { protocol, source })?;

    info!(
        protocol = %protocol,
        internal_port = mapping.internal_port,
        external_port = mapping.external_port,
        lifetime_seconds = mapping.lifetime_seconds,
        "Port mapping granted"
    );

    Ok(mapping)
}

/// Map ports, publish the TCP port to the client and check its downloads.
///
/// Stops at the first failure. An unhealthy verdict is reported as
/// [`RunError::HealthCheck`].
pub async fn run<M: PortMapper, C: TorrentApi>(
    mapper: &M,
    client: &C,
    settings: &RunSettings,
) -> Result<HealthReport, RunError> {
    // The UDP mapping only keeps the hole open, but must still succeed
    map_port(mapper, Protocol::Udp, settings).await?;
    let tcp = map_port(mapper, Protocol::Tcp, settings).await?;

    client.authenticate().await?;
    client.set_listening_port(tcp.external_port).await?;

    let torrents = client.list_torrents(DOWNLOADING_FILTER).await?;
    info!(torrents = torrents.len(), "Fetched in-progress downloads");

    let report = health::evaluate(
        &torrents,
        client,
        current_timestamp(),
        settings.activity_window,
    )
    .await?;

    if !report.is_healthy() {
        error!(stalled = report.dead(), "no running downloads");
        return Err(RunError::HealthCheck {
            stalled: report.dead(),
        });
    }

    info!(
        torrents = report.assessments.len(),
        alarms = report.alarms(),
        "Downloads are healthy"
    );

    Ok(report)
}
