use crate::media::LocalTrack;
use crate::peer::state::{InvalidTransition, LinkInput, LinkState, transition};
use crate::peer::transport::{LinkId, PeerTransport};
use anyhow::Result;
use liveroom_core::{IceCandidate, SessionDescription, TrackKind};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// One negotiated connection to a remote participant.
pub struct PeerLink {
    id: LinkId,
    state: LinkState,
    transport: Arc<dyn PeerTransport>,
    sent_kinds: HashSet<TrackKind>,
    pending_candidates: VecDeque<IceCandidate>,
    remote_description_set: bool,
}

impl PeerLink {
    pub fn new(id: LinkId, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            id,
            state: LinkState::Idle,
            transport,
            sent_kinds: HashSet::new(),
            pending_candidates: VecDeque::new(),
            remote_description_set: false,
        }
    }

    pub fn id(&self) -> &LinkId {
        &self.id
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sent_kinds(&self) -> &HashSet<TrackKind> {
        &self.sent_kinds
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn advance(&mut self, input: LinkInput) -> Result<LinkState, InvalidTransition> {
        let next = transition(self.state, input)?;
        debug!("link {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(next)
    }

    /// Creates and applies a local offer. The caller sends it and then feeds
    /// [`LinkInput::OfferSent`].
    pub async fn offer(&mut self) -> Result<SessionDescription> {
        self.advance(LinkInput::BeginOffer)?;
        let offer = self.transport.create_offer().await?;
        self.transport.set_local_description(offer.clone()).await?;
        Ok(offer)
    }

    /// Applies a remote offer and produces the answer. The caller sends it and
    /// then feeds [`LinkInput::AnswerSent`].
    pub async fn accept_offer(&mut self, offer: SessionDescription) -> Result<SessionDescription> {
        self.advance(LinkInput::RemoteOffer)?;
        self.transport.set_remote_description(offer).await?;
        self.remote_description_set = true;
        self.flush_candidates().await;

        let answer = self.transport.create_answer().await?;
        self.transport.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    /// Returns `Ok(false)` when no answer is expected in the current state.
    pub async fn apply_answer(&mut self, answer: SessionDescription) -> Result<bool> {
        if self.state != LinkState::AwaitingAnswer {
            return Ok(false);
        }
        self.transport.set_remote_description(answer).await?;
        self.remote_description_set = true;
        self.advance(LinkInput::RemoteAnswer)?;
        self.flush_candidates().await;
        Ok(true)
    }

    pub async fn add_remote_candidate(&mut self, candidate: IceCandidate) {
        if !self.remote_description_set {
            debug!("link {}: buffering early candidate", self.id);
            self.pending_candidates.push_back(candidate);
            return;
        }
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            warn!("link {}: failed to add ICE candidate: {:#}", self.id, e);
        }
    }

    async fn flush_candidates(&mut self) {
        while let Some(candidate) = self.pending_candidates.pop_front() {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                warn!("link {}: failed to add buffered ICE candidate: {:#}", self.id, e);
            }
        }
    }

    /// Replaces the sender of the track's kind, or adds one when absent.
    pub async fn attach_track(&mut self, track: &LocalTrack) -> Result<()> {
        if self.transport.has_sender(track.kind()).await {
            self.transport.replace_track(track).await?;
        } else {
            self.transport.add_track(track).await?;
        }
        self.sent_kinds.insert(track.kind());
        Ok(())
    }

    pub async fn close(&mut self) {
        if self.advance(LinkInput::Close).is_err() {
            return;
        }
        self.pending_candidates.clear();
        if let Err(e) = self.transport.close().await {
            warn!("link {}: error while closing transport: {:#}", self.id, e);
        }
    }
}
