use serde::Deserialize;

/// States in which the client reports no data transfer
pub const STALLED_STATES: [&str; 2] = ["stalledDL", "metaDL"];

/// One entry of `/api/v2/torrents/info`
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Torrent {
    /// Info hash as reported by the client, treated as opaque
    pub hash: String,
    pub name: String,
    /// Client state string, e.g. "downloading", "stalledDL", "metaDL"
    pub state: String,
    /// Completion in [0, 1]
    pub progress: f64,
    /// Unix timestamp of the last observed transfer
    pub last_activity: i64,
}

impl Torrent {
    /// Whether the client reports this torrent as not transferring
    pub fn is_stalled(&self) -> bool {
        STALLED_STATES.contains(&self.state.as_str())
    }
}
