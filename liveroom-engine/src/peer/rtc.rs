use crate::media::{LocalTrack, MediaHandle};
use crate::peer::transport::{LinkId, PeerTransport, PeerTransportFactory, TransportEvent, TransportState};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use liveroom_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription, TrackKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Конфигурация ICE для WebRTC транспорта.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: crate::config::default_ice_servers(),
        }
    }
}

impl TransportConfig {
    fn rtc_configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self
                .ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}

/// Sample tracks backing each [`LocalTrack`], shared by every link that sends it.
///
/// Capture code looks the track up by id and writes samples into it.
#[derive(Default, Clone)]
pub struct RtcTrackRegistry {
    tracks: Arc<DashMap<String, Arc<TrackLocalStaticSample>>>,
}

impl RtcTrackRegistry {
    pub fn get(&self, track_id: &str) -> Option<Arc<TrackLocalStaticSample>> {
        self.tracks.get(track_id).map(|t| t.clone())
    }

    fn track_for(&self, local: &LocalTrack) -> Arc<TrackLocalStaticSample> {
        self.tracks
            .entry(local.id().to_owned())
            .or_insert_with(|| {
                let mime_type = match local.kind() {
                    TrackKind::Video => MIME_TYPE_VP8,
                    TrackKind::Audio => MIME_TYPE_OPUS,
                };
                Arc::new(TrackLocalStaticSample::new(
                    RTCRtpCodecCapability {
                        mime_type: mime_type.to_owned(),
                        ..Default::default()
                    },
                    local.id().to_owned(),
                    "liveroom".to_owned(),
                ))
            })
            .clone()
    }
}

/// [`PeerTransport`] backed by a `webrtc` peer connection.
pub struct RtcTransport {
    link: LinkId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<TrackKind, Arc<RTCRtpSender>>>,
    registry: RtcTrackRegistry,
}

impl RtcTransport {
    /// Создание нового WebRTC соединения.
    /// events: канал, в который транспорт отдает события для цикла движка.
    pub async fn new(
        link: LinkId,
        config: &TransportConfig,
        registry: RtcTrackRegistry,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let interceptors = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(interceptors)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(config.rtc_configuration()).await?);

        let state_tx = events.clone();
        let state_link = link.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let link = state_link.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", link, s);
                    let state = match s {
                        RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => {
                            TransportState::New
                        }
                        RTCPeerConnectionState::Connecting => TransportState::Connecting,
                        RTCPeerConnectionState::Connected => TransportState::Connected,
                        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
                        RTCPeerConnectionState::Failed => TransportState::Failed,
                        RTCPeerConnectionState::Closed => TransportState::Closed,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(link, state)).await;
                })
            },
        ));

        // Trickle ICE: локальные кандидаты уходят удаленной стороне через сигналинг
        let ice_tx = events.clone();
        let ice_link = link.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let link = ice_link.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(link, candidate)).await;
            })
        }));

        let track_tx = events;
        let track_link = link.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let link = track_link.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    RTPCodecType::Unspecified => return,
                };
                let handle = MediaHandle {
                    track_id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                };
                debug!("Remote {} track on {}", kind, link);
                let _ = tx.send(TransportEvent::RemoteTrack(link, handle)).await;
            })
        }));

        Ok(Self {
            link,
            peer_connection,
            senders: Mutex::new(HashMap::new()),
            registry,
        })
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => bail!("rollback descriptions are not supported"),
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => bail!("session description without a type"),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        from_rtc(self.peer_connection.create_offer(None).await?)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        from_rtc(self.peer_connection.create_answer(None).await?)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await
            .context("failed to set local description")
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await
            .context("failed to set remote description")
    }

    async fn has_sender(&self, kind: TrackKind) -> bool {
        self.senders.lock().await.contains_key(&kind)
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        let sample = self.registry.track_for(track);
        let sender = self
            .peer_connection
            .add_track(sample as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .with_context(|| format!("failed to add {} track on {}", track.kind(), self.link))?;
        self.senders.lock().await.insert(track.kind(), sender);
        Ok(())
    }

    async fn replace_track(&self, track: &LocalTrack) -> Result<()> {
        let Some(sender) = self.senders.lock().await.get(&track.kind()).cloned() else {
            bail!("no {} sender on {}", track.kind(), self.link);
        };
        let sample = self.registry.track_for(track);
        sender
            .replace_track(Some(sample as Arc<dyn TrackLocal + Send + Sync>))
            .await
            .with_context(|| format!("failed to replace {} track on {}", track.kind(), self.link))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Builds one [`RtcTransport`] per link.
#[derive(Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
    registry: RtcTrackRegistry,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            registry: RtcTrackRegistry::default(),
        }
    }

    pub fn registry(&self) -> &RtcTrackRegistry {
        &self.registry
    }
}

#[async_trait]
impl PeerTransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        link: LinkId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport = RtcTransport::new(link, &self.config, self.registry.clone(), events).await?;
        Ok(Arc::new(transport))
    }
}
