pub mod client;

use crate::core::error::ClientError;
use crate::models::torrent::Torrent;

/// Filter selecting torrents that are still being downloaded
pub const DOWNLOADING_FILTER: &str = "downloading";

/// Peer lookups needed by the health evaluator
#[allow(async_fn_in_trait)]
pub trait PeerSource {
    /// Number of peers currently known for the torrent
    async fn peer_count(&self, hash: &str) -> Result<usize, ClientError>;
}

/// Control surface of the torrent client used by a run
#[allow(async_fn_in_trait)]
pub trait TorrentApi: PeerSource {
    /// Log in when credentials are configured; a no-op otherwise
    async fn authenticate(&self) -> Result<(), ClientError>;

    async fn set_listening_port(&self, port: u16) -> Result<(), ClientError>;

    async fn list_torrents(&self, filter: &str) -> Result<Vec<Torrent>, ClientError>;
}
