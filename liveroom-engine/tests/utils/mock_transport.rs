use anyhow::{Result, bail};
use async_trait::async_trait;
use liveroom_core::{IceCandidate, ParticipantId, SessionDescription, TrackKind};
use liveroom_engine::media::{LocalTrack, MediaHandle};
use liveroom_engine::peer::{LinkId, PeerTransport, PeerTransportFactory, TransportEvent, TransportState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Every call a [`MockTransport`] received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddTrack(TrackKind, String),
    ReplaceTrack(TrackKind, String),
    AddCandidate(String),
    Close,
}

/// In-memory peer transport. Descriptions carry the link id so both ends of
/// a negotiation can be matched up in assertions.
pub struct MockTransport {
    pub link: LinkId,
    events: mpsc::Sender<TransportEvent>,
    calls: Mutex<Vec<TransportCall>>,
    senders: Mutex<HashSet<TrackKind>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    closed: AtomicBool,
}

impl MockTransport {
    fn new(link: LinkId, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            link,
            events,
            calls: Mutex::new(Vec::new()),
            senders: Mutex::new(HashSet::new()),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn applied_candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn offers_created(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == TransportCall::CreateOffer)
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Simulates a locally gathered ICE candidate.
    pub async fn gather(&self, candidate: &str) {
        let _ = self
            .events
            .send(TransportEvent::CandidateGenerated(
                self.link.clone(),
                IceCandidate::new(candidate),
            ))
            .await;
    }

    pub async fn set_state(&self, state: TransportState) {
        let _ = self
            .events
            .send(TransportEvent::StateChanged(self.link.clone(), state))
            .await;
    }

    pub async fn remote_track(&self, kind: TrackKind) {
        let handle = MediaHandle {
            track_id: format!("{}-{}", self.link, kind),
            stream_id: format!("stream-{}", self.link.peer),
            kind,
        };
        let _ = self
            .events
            .send(TransportEvent::RemoteTrack(self.link.clone(), handle))
            .await;
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record(TransportCall::CreateOffer);
        Ok(SessionDescription::offer(format!("offer from {}", self.link)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record(TransportCall::CreateAnswer);
        if self.remote.lock().unwrap().is_none() {
            bail!("answer requested without a remote offer");
        }
        Ok(SessionDescription::answer(format!("answer from {}", self.link)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(TransportCall::SetLocal(desc.clone()));
        *self.local.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(TransportCall::SetRemote(desc.clone()));
        if desc.sdp.contains("corrupt") {
            bail!("unparseable session description");
        }
        *self.remote.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn has_sender(&self, kind: TrackKind) -> bool {
        self.senders.lock().unwrap().contains(&kind)
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        self.record(TransportCall::AddTrack(track.kind(), track.id().to_owned()));
        self.senders.lock().unwrap().insert(track.kind());
        Ok(())
    }

    async fn replace_track(&self, track: &LocalTrack) -> Result<()> {
        self.record(TransportCall::ReplaceTrack(track.kind(), track.id().to_owned()));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if self.remote.lock().unwrap().is_none() {
            bail!("candidate applied before the remote description");
        }
        if candidate.candidate.contains("bad") {
            bail!("rejected candidate {}", candidate.candidate);
        }
        self.record(TransportCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(TransportCall::Close);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`MockTransport`]s and remembers every one it created.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    created: Arc<Mutex<Vec<Arc<MockTransport>>>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<Arc<MockTransport>> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_for(&self, peer: &ParticipantId) -> Vec<Arc<MockTransport>> {
        self.created()
            .into_iter()
            .filter(|t| &t.link.peer == peer)
            .collect()
    }

    /// Most recent transport created for `peer`.
    pub fn latest(&self, peer: &ParticipantId) -> Option<Arc<MockTransport>> {
        self.created_for(peer).pop()
    }
}

#[async_trait]
impl PeerTransportFactory for MockTransportFactory {
    async fn create(
        &self,
        link: LinkId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport = Arc::new(MockTransport::new(link, events));
        self.created.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}
