use crate::error::{EngineError, Result};
use crate::media::LocalTrack;
use crate::peer::link::PeerLink;
use crate::peer::state::{LinkInput, LinkState};
use crate::peer::transport::{LinkId, PeerTransportFactory, TransportEvent};
use crate::signaling::Outbound;
use liveroom_core::{IceCandidate, ParticipantId, SessionDescription, SignalBody};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outcome of handling a remote offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Answered,
    /// Both sides offered and ours takes precedence; the remote offer was dropped.
    KeptLocalOffer,
}

/// Owns every peer link, keyed by remote id. At most one link per id.
pub struct PeerLinkManager {
    links: HashMap<ParticipantId, PeerLink>,
    next_generation: u64,
    factory: Arc<dyn PeerTransportFactory>,
    transport_tx: mpsc::Sender<TransportEvent>,
}

impl PeerLinkManager {
    pub fn new(
        factory: Arc<dyn PeerTransportFactory>,
        transport_tx: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            links: HashMap::new(),
            next_generation: 1,
            factory,
            transport_tx,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, peer: &ParticipantId) -> bool {
        self.links.contains_key(peer)
    }

    pub fn state(&self, peer: &ParticipantId) -> Option<LinkState> {
        self.links.get(peer).map(|l| l.state())
    }

    pub fn link(&self, peer: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(peer)
    }

    pub fn peers(&self) -> Vec<ParticipantId> {
        self.links.keys().cloned().collect()
    }

    /// True when `id` is the live generation for its peer.
    pub fn accepts(&self, id: &LinkId) -> bool {
        self.links
            .get(&id.peer)
            .is_some_and(|l| l.id() == id && l.state() != LinkState::Closed)
    }

    /// Creates a fresh link for `peer`, closing any previous one first.
    async fn create(&mut self, peer: &ParticipantId, tracks: &[LocalTrack]) -> Result<&mut PeerLink> {
        self.close(peer).await;

        let id = LinkId {
            peer: peer.clone(),
            generation: self.next_generation,
        };
        self.next_generation += 1;

        let transport = self
            .factory
            .create(id.clone(), self.transport_tx.clone())
            .await
            .map_err(|e| EngineError::negotiation(peer, e))?;

        let mut link = PeerLink::new(id, transport);
        for track in tracks {
            if let Err(e) = link.attach_track(track).await {
                warn!("Failed to attach {} track for {}: {:#}", track.kind(), peer, e);
            }
        }
        info!("Created link {}", link.id());

        Ok(self.links.entry(peer.clone()).insert_entry(link).into_mut())
    }

    /// Creates a link and sends our offer.
    pub async fn initiate(
        &mut self,
        peer: &ParticipantId,
        tracks: &[LocalTrack],
        out: &Outbound,
    ) -> Result<()> {
        let link = self.create(peer, tracks).await?;

        let result = link.offer().await;
        let offer = match result {
            Ok(offer) => offer,
            Err(e) => {
                self.close(peer).await;
                return Err(EngineError::negotiation(peer, e));
            }
        };

        out.send_to(peer, SignalBody::Offer(offer))?;
        if let Some(link) = self.links.get_mut(peer) {
            link.advance(LinkInput::OfferSent)
                .map_err(|e| EngineError::negotiation(peer, e))?;
        }
        Ok(())
    }

    pub async fn handle_offer(
        &mut self,
        self_id: &ParticipantId,
        from: &ParticipantId,
        offer: SessionDescription,
        tracks: &[LocalTrack],
        out: &Outbound,
    ) -> Result<OfferOutcome> {
        let reuse = match self.state(from) {
            None => false,
            Some(LinkState::Idle) => true,
            Some(state) if state.is_offering() => {
                if self_id.initiates_with(from) {
                    warn!("Glare with {}: keeping our offer, dropping theirs", from);
                    return Ok(OfferOutcome::KeptLocalOffer);
                }
                info!("Glare with {}: yielding to their offer", from);
                false
            }
            Some(state) => {
                warn!(
                    "Offer from {} while link is {}: recreating outside glare",
                    from, state
                );
                false
            }
        };

        if !reuse {
            self.create(from, tracks).await?;
        }
        let Some(link) = self.links.get_mut(from) else {
            return Err(EngineError::protocol(format!("link to {from} vanished")));
        };

        let result = link.accept_offer(offer).await;
        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                self.close(from).await;
                return Err(EngineError::negotiation(from, e));
            }
        };

        out.send_to(from, SignalBody::Answer(answer))?;
        if let Some(link) = self.links.get_mut(from) {
            link.advance(LinkInput::AnswerSent)
                .map_err(|e| EngineError::negotiation(from, e))?;
        }
        Ok(OfferOutcome::Answered)
    }

    pub async fn handle_answer(&mut self, from: &ParticipantId, answer: SessionDescription) -> Result<()> {
        let Some(link) = self.links.get_mut(from) else {
            return Err(EngineError::protocol(format!("answer from {from} without a link")));
        };

        let state = link.state();
        let result = link.apply_answer(answer).await;
        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!("Ignoring answer from {} in state {}", from, state);
                Ok(())
            }
            Err(e) => {
                self.close(from).await;
                Err(EngineError::negotiation(from, e))
            }
        }
    }

    pub async fn handle_candidate(&mut self, from: &ParticipantId, candidate: IceCandidate) -> Result<()> {
        let Some(link) = self.links.get_mut(from) else {
            return Err(EngineError::protocol(format!(
                "ICE candidate from {from} without a link"
            )));
        };
        link.add_remote_candidate(candidate).await;
        Ok(())
    }

    /// Sends a locally gathered candidate if its link is still current and the
    /// channel is open. Otherwise the candidate is dropped.
    pub fn handle_local_candidate(
        &self,
        link: &LinkId,
        candidate: IceCandidate,
        out: &Outbound,
    ) -> Result<()> {
        if !self.accepts(link) {
            debug!("Dropping candidate from superseded link {}", link);
            return Ok(());
        }
        if !out.is_open() {
            debug!("Dropping candidate for {}: channel closed", link.peer);
            return Ok(());
        }
        out.send_to(&link.peer, SignalBody::IceCandidate(candidate))
    }

    /// Puts `track` on every link. Links that fail are closed and reported.
    pub async fn attach_track(&mut self, track: &LocalTrack) -> Vec<EngineError> {
        let mut failed = Vec::new();
        for (peer, link) in self.links.iter_mut() {
            if let Err(e) = link.attach_track(track).await {
                warn!("Track replacement failed for {}: {:#}", peer, e);
                failed.push((peer.clone(), e));
            }
        }

        let mut errors = Vec::with_capacity(failed.len());
        for (peer, e) in failed {
            self.close(&peer).await;
            errors.push(EngineError::negotiation(&peer, e));
        }
        errors
    }

    /// Closes and removes the link for `peer`. Returns whether one existed.
    pub async fn close(&mut self, peer: &ParticipantId) -> bool {
        match self.links.remove(peer) {
            Some(mut link) => {
                link.close().await;
                info!("Closed link {}", link.id());
                true
            }
            None => false,
        }
    }
}
