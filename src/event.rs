use serde::{Deserialize, Serialize};

/// SessionEvent represents events published by the media pipeline of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum SessionEvent {
    /// A DTMF digit was detected on a track
    #[serde(rename = "dtmf")]
    DTMF {
        track_id: String,
        timestamp: u64,
        digit: String,
    },
}

impl SessionEvent {
    pub fn timestamp(&self) -> u64 {
        match self {
            SessionEvent::DTMF { timestamp, .. } => *timestamp,
        }
    }

    pub fn track_id(&self) -> &str {
        match self {
            SessionEvent::DTMF { track_id, .. } => track_id,
        }
    }
}

/// Type alias for the event sender
pub type EventSender = tokio::sync::broadcast::Sender<SessionEvent>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::broadcast::Receiver<SessionEvent>;

pub fn create_event_sender() -> EventSender {
    let (sender, _) = tokio::sync::broadcast::channel(128);
    sender
}
