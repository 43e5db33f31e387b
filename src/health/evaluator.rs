use std::time::Duration;
use tracing::{error, info};

use super::report::{Assessment, Classification, HealthReport};
use crate::api::PeerSource;
use crate::core::error::ClientError;
use crate::models::torrent::Torrent;
use crate::utils::percent::format_percent;
use crate::utils::time::is_within;

/// Classification possible without asking the client for peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage {
    RecentlyActive,
    Stalled,
    Running,
}

/// First pass over a torrent. Recent activity wins over the state field,
/// which can lag behind the activity timestamp.
pub fn triage(torrent: &Torrent, now: i64, window: Duration) -> Triage {
    if is_within(torrent.last_activity, window, now) {
        Triage::RecentlyActive
    } else if torrent.is_stalled() {
        Triage::Stalled
    } else {
        Triage::Running
    }
}

/// Classify every torrent of the snapshot.
///
/// Peers are only looked up for stalled torrents. A failed lookup aborts the
/// whole evaluation even when another torrent already proved health.
pub async fn evaluate<P: PeerSource>(
    torrents: &[Torrent],
    peers: &P,
    now: i64,
    window: Duration,
) -> Result<HealthReport, ClientError> {
    let mut report = HealthReport::default();

    for torrent in torrents {
        let classification = match triage(torrent, now, window) {
            Triage::RecentlyActive => {
                info!(
                    name = %torrent.name,
                    state = %torrent.state,
                    last_activity = torrent.last_activity,
                    "found new download"
                );
                Classification::RecentlyActive
            }
            Triage::Stalled => {
                let count = peers.peer_count(&torrent.hash).await?;
                error!(
                    name = %torrent.name,
                    state = %torrent.state,
                    progress = %format_percent(torrent.progress),
                    peers = count,
                    "found stalled download"
                );
                if count > 0 {
                    Classification::StalledWithPeers(count)
                } else {
                    Classification::StalledWithoutPeers
                }
            }
            Triage::Running => {
                info!(
                    name = %torrent.name,
                    state = %torrent.state,
                    progress = %format_percent(torrent.progress),
                    "found running download"
                );
                Classification::Running
            }
        };

        report.assessments.push(Assessment::new(torrent, classification));
    }

    Ok(report)
}
