use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::signal::HeartRateZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Monitoring,
}

/// What the UI sees of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStatus {
    pub state: SessionState,
    pub bpm: Option<u32>,
    /// When the current `bpm` was accepted.
    pub measured_at: Option<DateTime<Utc>>,
    /// Why the last session ended on its own, if it did.
    pub fault: Option<String>,
}

impl MonitorStatus {
    pub fn zone(&self) -> Option<HeartRateZone> {
        self.bpm.map(HeartRateZone::classify)
    }

    pub fn is_monitoring(&self) -> bool {
        self.state == SessionState::Monitoring
    }
}
