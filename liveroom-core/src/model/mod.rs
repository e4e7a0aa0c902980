mod media;
mod participant;
mod room;
mod session;
mod signaling;

pub use media::TrackKind;
pub use participant::{ConnectionQuality, ParticipantId, ParticipantSummary};
pub use room::RoomId;
pub use session::{IceCandidate, SdpType, SessionDescription};
pub use signaling::{DecodeError, IceServerConfig, SignalBody, SignalMessage, WireMessage};
