use serde::Deserialize;
use std::collections::HashMap;

/// Body of `/api/v2/sync/torrentPeers`, keyed by "ip:port"
#[derive(Debug, Deserialize)]
pub struct PeerList {
    /// Peer details are not inspected, only counted
    #[serde(default)]
    pub peers: HashMap<String, serde_json::Value>,
}

impl PeerList {
    pub fn count(&self) -> usize {
        self.peers.len()
    }
}
