pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod media;
pub mod peer;
pub mod roster;
pub mod signaling;

pub use config::EngineConfig;
pub use coordinator::{
    ChatMessage, EndReason, Engine, EngineCommand, EngineEvent, EngineHandle, EngineSnapshot,
};
pub use error::{EngineError, ErrorKind};
pub use host::HostPolicy;
pub use media::{LocalTrack, MediaBundle, MediaCapture, MediaHandle, NoCapture, TrackEnd, TrackSource};
pub use peer::{LinkId, LinkState, PeerLinkManager, PeerTransport, PeerTransportFactory, TransportEvent, TransportState};
pub use roster::{Participant, Roster};
pub use signaling::{InboundFrame, OutboundFrame, SignalingChannel};

use std::sync::Arc;

/// Connects to the relay at `url` and spawns an engine using the `webrtc` transport.
pub async fn join(
    url: &str,
    config: EngineConfig,
    capture: Arc<dyn MediaCapture>,
) -> anyhow::Result<EngineHandle> {
    let (channel, inbound) = signaling::ws_client::connect(url).await?;
    let factory = peer::rtc::RtcTransportFactory::new(peer::rtc::TransportConfig {
        ice_servers: config.ice_servers.clone(),
    });
    let (engine, handle) = Engine::new(config, channel, inbound, capture, Arc::new(factory));
    tokio::spawn(engine.run());
    Ok(handle)
}
