mod command;
mod event;
mod handle;
mod inbound;
mod intents;

pub use command::EngineCommand;
pub use event::{ChatMessage, EndReason, EngineEvent, EventSink};
pub use handle::{EngineHandle, EngineSnapshot};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::host::HostPolicy;
use crate::media::{LocalMedia, MediaCapture};
use crate::peer::{LinkState, PeerLinkManager, PeerTransportFactory, TransportEvent, TransportState};
use crate::roster::Roster;
use crate::signaling::{InboundFrame, Outbound, SignalingChannel};
use liveroom_core::{ConnectionQuality, ParticipantId, SignalBody, TrackKind};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// The negotiation coordinator: a single actor that owns the roster, the peer
/// links, the host policy and the local media state.
pub struct Engine {
    config: EngineConfig,
    out: Outbound,
    inbound_rx: mpsc::Receiver<InboundFrame>,
    command_rx: mpsc::Receiver<EngineCommand>,
    command_tx: mpsc::Sender<EngineCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    links: PeerLinkManager,
    roster: Roster,
    host: HostPolicy,
    media: LocalMedia,
    capture: Arc<dyn MediaCapture>,
    events: EventSink,
    state_tx: watch::Sender<EngineSnapshot>,
    connected: bool,
    ended: bool,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        channel: SignalingChannel,
        inbound_rx: mpsc::Receiver<InboundFrame>,
        capture: Arc<dyn MediaCapture>,
        factory: Arc<dyn PeerTransportFactory>,
    ) -> (Self, EngineHandle) {
        let self_id = config.self_id.clone().unwrap_or_else(ParticipantId::generate);
        let (command_tx, command_rx) = mpsc::channel(64);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let events = EventSink::new(config.event_capacity);
        let out = Outbound::new(channel, self_id.clone(), config.room_id.clone());
        let media = LocalMedia::new(config.start_with_video, config.start_with_audio);

        let engine = Self {
            out,
            inbound_rx,
            command_rx,
            command_tx: command_tx.clone(),
            transport_rx,
            links: PeerLinkManager::new(factory, transport_tx),
            roster: Roster::new(),
            host: HostPolicy::new(),
            media,
            capture,
            events: events.clone(),
            state_tx: watch::Sender::new(EngineSnapshot {
                self_id: self_id.clone(),
                room_id: config.room_id.clone(),
                connected: false,
                ended: false,
                is_host: false,
                host_id: None,
                roster: Vec::new(),
                links: Default::default(),
                video_enabled: config.start_with_video,
                audio_enabled: config.start_with_audio,
                screen_sharing: false,
            }),
            config,
            connected: false,
            ended: false,
        };

        let handle = EngineHandle::new(self_id, command_tx, events, engine.state_tx.subscribe());
        (engine, handle)
    }

    pub fn self_id(&self) -> &ParticipantId {
        self.out.self_id()
    }

    pub async fn run(mut self) {
        info!(
            "Engine for {} in room {} started",
            self.self_id(),
            self.out.room_id()
        );

        self.start().await;
        self.publish();

        while !self.ended {
            tokio::select! {
                frame = self.inbound_rx.recv() => {
                    match frame {
                        Some(InboundFrame::Text(text)) => self.handle_text(&text).await,
                        Some(InboundFrame::Closed(reason)) => self.handle_channel_lost(reason).await,
                        None => self.handle_channel_lost(None).await,
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            warn!("Command channel closed unexpectedly");
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }

            self.publish();
        }

        info!("Engine for {} finished", self.self_id());
    }

    async fn start(&mut self) {
        self.connected = self.out.is_open();
        self.events.emit(EngineEvent::Connected(self.connected));

        let (video, audio) = (self.config.start_with_video, self.config.start_with_audio);
        if video || audio {
            match self.capture.acquire(video, audio).await {
                Ok(bundle) => self.media.install(bundle),
                Err(e) => self.report(e),
            }
        }
        for kind in [TrackKind::Video, TrackKind::Audio] {
            let wanted = self.media.is_enabled(kind);
            match self.media.track(kind) {
                Some(track) => track.set_enabled(wanted),
                None => self.media.set_enabled(kind, false),
            }
        }

        let username = Some(self.config.display_name.clone());
        let body = if self.config.create_room {
            SignalBody::CreateRoom { username }
        } else {
            SignalBody::Join { username }
        };
        if let Err(e) = self.out.broadcast(body) {
            self.report(e);
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(link, candidate) => {
                if let Err(e) = self.links.handle_local_candidate(&link, candidate, &self.out) {
                    self.report(e);
                }
            }

            TransportEvent::RemoteTrack(link, handle) => {
                if !self.links.accepts(&link) {
                    debug!("Ignoring remote track from superseded link {}", link);
                    return;
                }
                info!("Remote {} media from {}", handle.kind, link.peer);
                self.events.emit(EngineEvent::RemoteMediaAdded {
                    participant_id: link.peer,
                    handle,
                });
            }

            TransportEvent::StateChanged(link, state) => {
                if !self.links.accepts(&link) {
                    debug!("Ignoring state {:?} from superseded link {}", state, link);
                    return;
                }

                let quality = match state {
                    TransportState::Connected => ConnectionQuality::Good,
                    TransportState::Connecting => ConnectionQuality::Medium,
                    TransportState::Disconnected | TransportState::Failed => ConnectionQuality::Poor,
                    TransportState::New | TransportState::Closed => return,
                };
                self.set_quality(&link.peer, quality);

                if state == TransportState::Failed {
                    let peer = link.peer.clone();
                    self.links.close(&peer).await;
                    self.report(EngineError::negotiation(
                        &peer,
                        anyhow::anyhow!("media transport failed"),
                    ));
                }
            }
        }
    }

    fn set_quality(&mut self, peer: &ParticipantId, quality: ConnectionQuality) {
        if let Some(p) = self.roster.set_quality(peer, quality) {
            let updated = p.clone();
            self.events.emit(EngineEvent::ParticipantUpdated(updated));
        }
        self.events.emit(EngineEvent::ConnectionStateChanged {
            participant_id: peer.clone(),
            quality,
        });
    }

    async fn handle_channel_lost(&mut self, reason: Option<String>) {
        if self.ended {
            return;
        }
        let reason = reason.unwrap_or_else(|| "connection closed".to_owned());
        warn!("Signaling channel lost: {}", reason);
        self.report(EngineError::SignalingTransport(reason));
        self.end_session(EndReason::TransportLost).await;
    }

    /// Tears everything down. Only the first call has an effect.
    async fn end_session(&mut self, reason: EndReason) {
        if self.ended {
            return;
        }
        info!("Session ended: {:?}", reason);

        for peer in self.links.peers() {
            self.drop_link(&peer).await;
        }
        self.roster.clear();
        self.host.reset();
        self.media.clear();
        self.out.close();

        self.connected = false;
        self.ended = true;
        self.events.emit(EngineEvent::Connected(false));
        self.events.emit(EngineEvent::SessionEnded(reason));
    }

    /// Closes the link to `peer` (if any) and tells the renderer to drop its media.
    async fn drop_link(&mut self, peer: &ParticipantId) {
        if self.links.close(peer).await {
            self.emit_link_state(peer);
            self.events.emit(EngineEvent::RemoteMediaRemoved {
                participant_id: peer.clone(),
            });
        }
    }

    fn emit_link_state(&self, peer: &ParticipantId) {
        self.events.emit(EngineEvent::LinkStateChanged {
            participant_id: peer.clone(),
            state: self.links.state(peer).unwrap_or(LinkState::Closed),
        });
    }

    /// Logs an error and surfaces it to subscribers. Nothing here is fatal.
    fn report(&self, e: EngineError) {
        warn!("{}", e);
        if let EngineError::Negotiation { peer, .. } = &e
            && !self.links.contains(peer)
        {
            self.emit_link_state(peer);
            self.events.emit(EngineEvent::RemoteMediaRemoved {
                participant_id: peer.clone(),
            });
        }
        self.events.emit(EngineEvent::from(&e));
    }

    fn publish(&self) {
        let links = self
            .links
            .peers()
            .into_iter()
            .filter_map(|p| self.links.state(&p).map(|s| (p, s)))
            .collect();

        self.state_tx.send_replace(EngineSnapshot {
            self_id: self.self_id().clone(),
            room_id: self.out.room_id().clone(),
            connected: self.connected,
            ended: self.ended,
            is_host: self.host.is_host(),
            host_id: self.host.host_id().cloned(),
            roster: self.roster.snapshot(),
            links,
            video_enabled: self.media.is_enabled(TrackKind::Video),
            audio_enabled: self.media.is_enabled(TrackKind::Audio),
            screen_sharing: self.media.is_screen_sharing(),
        });
    }
}
