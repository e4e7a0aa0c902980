use liveroom_core::ParticipantId;
use serde::Serialize;

/// Error taxonomy of the engine. None of these is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Capture acquisition failed. Surfaced to the user, never retried.
    #[error("media device error: {0}")]
    Device(String),

    /// The signaling channel closed or errored. All links are torn down.
    #[error("signaling transport error: {0}")]
    SignalingTransport(String),

    /// Offer/answer/candidate application failed for one link.
    #[error("negotiation with {peer} failed: {reason:#}")]
    Negotiation {
        peer: ParticipantId,
        reason: anyhow::Error,
    },

    /// Malformed or out-of-order message. Dropped with a warning.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Device,
    SignalingTransport,
    Negotiation,
    ProtocolViolation,
}

impl EngineError {
    pub fn negotiation(peer: &ParticipantId, reason: impl Into<anyhow::Error>) -> Self {
        Self::Negotiation {
            peer: peer.clone(),
            reason: reason.into(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Device(_) => ErrorKind::Device,
            EngineError::SignalingTransport(_) => ErrorKind::SignalingTransport,
            EngineError::Negotiation { .. } => ErrorKind::Negotiation,
            EngineError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
