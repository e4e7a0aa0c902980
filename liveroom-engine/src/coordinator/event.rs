use crate::error::{EngineError, ErrorKind};
use crate::media::MediaHandle;
use crate::peer::LinkState;
use crate::roster::Participant;
use liveroom_core::{ConnectionQuality, ParticipantId, TrackKind};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub from: ParticipantId,
    pub username: String,
    pub content: String,
    pub sent_at_millis: u64,
    pub is_own: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    Kicked,
    Left,
    TransportLost,
}

/// Everything the engine reports to the outside world.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Connected(bool),
    JoinedRoom {
        self_id: ParticipantId,
        is_host: bool,
        host_id: Option<ParticipantId>,
    },
    RosterReplaced(Vec<Participant>),
    ParticipantJoined(Participant),
    ParticipantLeft(ParticipantId),
    ParticipantUpdated(Participant),
    HostChanged {
        host_id: ParticipantId,
        self_is_host: bool,
    },
    LocalCapabilityChanged {
        kind: TrackKind,
        enabled: bool,
    },
    ScreenShareChanged(bool),
    ChatReceived(ChatMessage),
    LinkStateChanged {
        participant_id: ParticipantId,
        state: LinkState,
    },
    ConnectionStateChanged {
        participant_id: ParticipantId,
        quality: ConnectionQuality,
    },
    RemoteMediaAdded {
        participant_id: ParticipantId,
        handle: MediaHandle,
    },
    RemoteMediaRemoved {
        participant_id: ParticipantId,
    },
    SessionEnded(EndReason),
    Warning {
        kind: ErrorKind,
        message: String,
    },
}

impl From<&EngineError> for EngineEvent {
    fn from(e: &EngineError) -> Self {
        EngineEvent::Warning {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Publishes events to every subscriber. Having no subscribers is fine.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            debug!("No subscribers for engine event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}
