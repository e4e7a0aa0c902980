use crate::model::participant::{ParticipantId, ParticipantSummary};
use crate::model::room::RoomId;
use crate::model::session::{IceCandidate, SessionDescription};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Raw JSON object exchanged with the relay: `{type, from, to?, roomId, data?, content?, username?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid signaling JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("`{kind}` message is missing `{field}`")]
    MissingField { kind: String, field: &'static str },
    #[error("`{kind}` message carries malformed data: {source}")]
    MalformedData {
        kind: String,
        source: serde_json::Error,
    },
}

/// Typed payload of a signaling message, one variant per wire `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalBody {
    CreateRoom {
        username: Option<String>,
    },
    Join {
        username: Option<String>,
    },
    JoinSuccess {
        username: Option<String>,
        is_host: bool,
        host_id: Option<ParticipantId>,
    },
    UsersList(Vec<ParticipantSummary>),
    UserJoined {
        username: Option<String>,
    },
    UserLeft,
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
    ToggleVideo {
        enabled: bool,
    },
    ToggleAudio {
        enabled: bool,
    },
    MuteUser,
    UserMuted {
        audio_enabled: bool,
    },
    KickUser,
    MakeHost,
    HostUpdated {
        host_id: ParticipantId,
    },
    Chat {
        username: Option<String>,
        content: String,
    },
}

impl SignalBody {
    /// Wire `type` string for this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalBody::CreateRoom { .. } => "create-room",
            SignalBody::Join { .. } => "join",
            SignalBody::JoinSuccess { .. } => "join-success",
            SignalBody::UsersList(_) => "users-list",
            SignalBody::UserJoined { .. } => "user-joined",
            SignalBody::UserLeft => "user-left",
            SignalBody::Offer(_) => "offer",
            SignalBody::Answer(_) => "answer",
            SignalBody::IceCandidate(_) => "ice-candidate",
            SignalBody::ToggleVideo { .. } => "toggle-video",
            SignalBody::ToggleAudio { .. } => "toggle-audio",
            SignalBody::MuteUser => "mute-user",
            SignalBody::UserMuted { .. } => "user-muted",
            SignalBody::KickUser => "kick-user",
            SignalBody::MakeHost => "make-host",
            SignalBody::HostUpdated { .. } => "host-updated",
            SignalBody::Chat { .. } => "chat",
        }
    }
}

/// A decoded signaling message. `to == None` means broadcast to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub struct SignalMessage {
    pub from: Option<ParticipantId>,
    pub to: Option<ParticipantId>,
    pub room_id: Option<RoomId>,
    pub body: SignalBody,
}

impl SignalMessage {
    pub fn new(body: SignalBody) -> Self {
        Self {
            from: None,
            to: None,
            room_id: None,
            body,
        }
    }

    pub fn sent_by(mut self, id: ParticipantId) -> Self {
        self.from = Some(id);
        self
    }

    pub fn addressed_to(mut self, id: ParticipantId) -> Self {
        self.to = Some(id);
        self
    }

    pub fn in_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let wire: WireMessage = serde_json::from_str(text)?;
        Self::try_from(wire)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireMessage::from(self.clone()))
    }
}

#[derive(Deserialize)]
struct EnabledData {
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinSuccessData {
    #[serde(default)]
    is_host: bool,
    #[serde(default)]
    host_id: Option<ParticipantId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserMutedData {
    #[serde(default)]
    audio_enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostUpdatedData {
    host_id: ParticipantId,
}

fn default_true() -> bool {
    true
}

fn required_data<T: DeserializeOwned>(wire: &mut WireMessage) -> Result<T, DecodeError> {
    let Some(data) = wire.data.take() else {
        return Err(DecodeError::MissingField {
            kind: wire.kind.clone(),
            field: "data",
        });
    };
    serde_json::from_value(data).map_err(|source| DecodeError::MalformedData {
        kind: wire.kind.clone(),
        source,
    })
}

/// Optional payloads fall back to the type's defaults, the way the browser client reads them.
fn optional_data<T: DeserializeOwned>(wire: &mut WireMessage) -> Result<T, DecodeError> {
    let data = wire.data.take().unwrap_or_else(|| json!({}));
    serde_json::from_value(data).map_err(|source| DecodeError::MalformedData {
        kind: wire.kind.clone(),
        source,
    })
}

impl TryFrom<WireMessage> for SignalMessage {
    type Error = DecodeError;

    fn try_from(mut wire: WireMessage) -> Result<Self, Self::Error> {
        let kind = wire.kind.clone();
        let body = match kind.as_str() {
            "create-room" => SignalBody::CreateRoom {
                username: wire.username.take(),
            },
            "join" => SignalBody::Join {
                username: wire.username.take(),
            },
            "join-success" => {
                let data: JoinSuccessData = optional_data(&mut wire)?;
                SignalBody::JoinSuccess {
                    username: wire.username.take(),
                    is_host: data.is_host,
                    host_id: data.host_id,
                }
            }
            "users-list" => match wire.data.take() {
                Some(data) => SignalBody::UsersList(serde_json::from_value(data).map_err(
                    |source| DecodeError::MalformedData {
                        kind: wire.kind.clone(),
                        source,
                    },
                )?),
                None => SignalBody::UsersList(Vec::new()),
            },
            "user-joined" => SignalBody::UserJoined {
                username: wire.username.take(),
            },
            "user-left" => SignalBody::UserLeft,
            "offer" => SignalBody::Offer(required_data(&mut wire)?),
            "answer" => SignalBody::Answer(required_data(&mut wire)?),
            "ice-candidate" => SignalBody::IceCandidate(required_data(&mut wire)?),
            "toggle-video" => SignalBody::ToggleVideo {
                enabled: optional_data::<EnabledData>(&mut wire)?.enabled,
            },
            "toggle-audio" => SignalBody::ToggleAudio {
                enabled: optional_data::<EnabledData>(&mut wire)?.enabled,
            },
            "mute-user" => SignalBody::MuteUser,
            "user-muted" => SignalBody::UserMuted {
                audio_enabled: optional_data::<UserMutedData>(&mut wire)?.audio_enabled,
            },
            "kick-user" => SignalBody::KickUser,
            "make-host" => SignalBody::MakeHost,
            "host-updated" => SignalBody::HostUpdated {
                host_id: required_data::<HostUpdatedData>(&mut wire)?.host_id,
            },
            "chat" => {
                let Some(content) = wire.content.take() else {
                    return Err(DecodeError::MissingField {
                        kind: wire.kind,
                        field: "content",
                    });
                };
                SignalBody::Chat {
                    username: wire.username.take(),
                    content,
                }
            }
            other => return Err(DecodeError::UnknownType(other.to_owned())),
        };

        Ok(Self {
            from: wire.from.map(ParticipantId::from),
            to: wire.to.map(ParticipantId::from),
            room_id: wire.room_id.map(RoomId::from),
            body,
        })
    }
}

impl From<SignalMessage> for WireMessage {
    fn from(msg: SignalMessage) -> Self {
        let mut wire = WireMessage {
            kind: msg.body.kind().to_owned(),
            from: msg.from.map(|id| id.0),
            to: msg.to.map(|id| id.0),
            room_id: msg.room_id.map(|id| id.0),
            ..Default::default()
        };

        match msg.body {
            SignalBody::CreateRoom { username }
            | SignalBody::Join { username }
            | SignalBody::UserJoined { username } => wire.username = username,
            SignalBody::JoinSuccess {
                username,
                is_host,
                host_id,
            } => {
                wire.username = username;
                wire.data = Some(json!({ "isHost": is_host, "hostId": host_id }));
            }
            SignalBody::UsersList(users) => wire.data = serde_json::to_value(users).ok(),
            SignalBody::UserLeft
            | SignalBody::MuteUser
            | SignalBody::KickUser
            | SignalBody::MakeHost => {}
            SignalBody::Offer(desc) | SignalBody::Answer(desc) => {
                wire.data = serde_json::to_value(desc).ok()
            }
            SignalBody::IceCandidate(candidate) => wire.data = serde_json::to_value(candidate).ok(),
            SignalBody::ToggleVideo { enabled } | SignalBody::ToggleAudio { enabled } => {
                wire.data = Some(json!({ "enabled": enabled }))
            }
            SignalBody::UserMuted { audio_enabled } => {
                wire.data = Some(json!({ "audioEnabled": audio_enabled }))
            }
            SignalBody::HostUpdated { host_id } => wire.data = Some(json!({ "hostId": host_id })),
            SignalBody::Chat { username, content } => {
                wire.username = username;
                wire.content = Some(content);
            }
        }

        wire
    }
}
