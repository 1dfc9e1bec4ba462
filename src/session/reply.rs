use chrono::{DateTime, Utc};
use serde::Serialize;

use super::controller::TurnPhase;
use crate::audio::{AudioClip, RecordingStatus};

/// Published outputs of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// 1-based index of the completed turn
    pub turn_index: u32,

    /// Reply transcript from the interview service
    pub transcript: String,

    /// Playable reply clip
    pub audio: AudioClip,

    /// When the reply was published
    pub received_at: DateTime<Utc>,
}

/// Snapshot of the controller, for UI gating.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: TurnPhase,
    pub recording: RecordingStatus,
    pub exchange_in_flight: bool,
    pub turns_completed: u32,
    pub started_at: DateTime<Utc>,
}
