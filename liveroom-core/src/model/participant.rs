use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque participant id, assigned once at join time.
///
/// Ordering is a plain byte-wise string comparison. Both ends of a pair rely on
/// it to agree on who sends the first offer, so it must never change.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Generates an id of the form `user_<epoch-millis>_<9 chars>`.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("user_{}_{}", millis, &suffix[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this side must send the initial offer to `remote`.
    pub fn initiates_with(&self, remote: &ParticipantId) -> bool {
        self < remote
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    #[default]
    Unknown,
    Good,
    Medium,
    Poor,
}

/// One entry of a `users-list` snapshot.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub user_id: ParticipantId,
    pub username: String,
    #[serde(default = "enabled")]
    pub is_video_enabled: bool,
    #[serde(default = "enabled")]
    pub is_audio_enabled: bool,
    #[serde(default)]
    pub is_host: bool,
}

impl ParticipantSummary {
    pub fn new(user_id: ParticipantId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_video_enabled: true,
            is_audio_enabled: true,
            is_host: false,
        }
    }
}

fn enabled() -> bool {
    true
}
