use liveroom_core::{IceServerConfig, ParticipantId, RoomId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Engine settings for one room session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub room_id: RoomId,
    /// Fixed local id. A fresh `user_<millis>_<suffix>` id is generated when unset.
    pub self_id: Option<ParticipantId>,
    pub display_name: String,
    /// Send `create-room` instead of `join` (the creator becomes host).
    pub create_room: bool,
    pub ice_servers: Vec<IceServerConfig>,
    pub start_with_video: bool,
    pub start_with_audio: bool,
    /// Capacity of the outward event broadcast channel.
    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn new(room_id: impl Into<RoomId>, display_name: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            display_name: display_name.into(),
            ..Default::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            room_id: RoomId::from("lobby"),
            self_id: None,
            display_name: String::from("guest"),
            create_room: false,
            ice_servers: default_ice_servers(),
            start_with_video: true,
            start_with_audio: true,
            event_capacity: 256,
        }
    }
}

pub fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![
        IceServerConfig::stun(DEFAULT_STUN_ADDR),
        IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
    ]
}
