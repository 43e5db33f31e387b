use crate::models::torrent::Torrent;

/// How loudly a torrent is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Alarm,
}

/// Bucket a torrent falls into, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Transferred data within the activity window, whatever its state
    RecentlyActive,
    /// Stalled, but peers are connected and may resume the transfer
    StalledWithPeers(usize),
    StalledWithoutPeers,
    /// Any other state, e.g. "downloading" or "queuedDL"
    Running,
}

impl Classification {
    /// Whether this torrent keeps the run healthy
    pub fn is_healthy(self) -> bool {
        !matches!(self, Classification::StalledWithoutPeers)
    }

    pub fn severity(self) -> Severity {
        match self {
            Classification::RecentlyActive | Classification::Running => Severity::Info,
            Classification::StalledWithPeers(_) | Classification::StalledWithoutPeers => {
                Severity::Alarm
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub hash: String,
    pub name: String,
    pub state: String,
    pub progress: f64,
    pub classification: Classification,
}

impl Assessment {
    pub fn new(torrent: &Torrent, classification: Classification) -> Self {
        Self {
            hash: torrent.hash.clone(),
            name: torrent.name.clone(),
            state: torrent.state.clone(),
            progress: torrent.progress,
            classification,
        }
    }
}

/// Outcome of one evaluation, in snapshot order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport {
    pub assessments: Vec<Assessment>,
}

impl HealthReport {
    /// An empty snapshot is healthy: nothing is in progress, so nothing is stuck
    pub fn is_healthy(&self) -> bool {
        self.assessments.is_empty()
            || self
                .assessments
                .iter()
                .any(|assessment| assessment.classification.is_healthy())
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.assessments
            .iter()
            .filter(|assessment| assessment.classification == classification)
            .count()
    }

    /// Stalled torrents with no peers at all
    pub fn dead(&self) -> usize {
        self.count(Classification::StalledWithoutPeers)
    }

    pub fn alarms(&self) -> usize {
        self.assessments
            .iter()
            .filter(|assessment| assessment.classification.severity() == Severity::Alarm)
            .count()
    }
}
