use crate::media::{LocalTrack, MediaHandle};
use anyhow::Result;
use async_trait::async_trait;
use liveroom_core::{IceCandidate, ParticipantId, SessionDescription, TrackKind};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity of one peer link instance. The generation distinguishes a link
/// from the ones it replaced for the same participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkId {
    pub peer: ParticipantId,
    pub generation: u64,
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.peer, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a media transport reports back to the engine loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be sent to the remote side.
    CandidateGenerated(LinkId, IceCandidate),

    /// The remote side started sending a track.
    RemoteTrack(LinkId, MediaHandle),

    /// Connection state of the underlying transport changed.
    StateChanged(LinkId, TransportState),
}

/// Peer link capability provided by the media-transport collaborator.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Whether an outgoing sender of this kind already exists.
    async fn has_sender(&self, kind: TrackKind) -> bool;

    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swap the track of the existing sender of the same kind.
    async fn replace_track(&self, track: &LocalTrack) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates a transport per link. Events for the link go to `events`.
#[async_trait]
pub trait PeerTransportFactory: Send + Sync {
    async fn create(
        &self,
        link: LinkId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
