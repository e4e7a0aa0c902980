use liveroom_core::{ParticipantId, TrackKind};

/// Local intents fed to the engine loop through [`EngineHandle`](crate::EngineHandle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Turn the local track of `kind` on or off.
    SetCapability { kind: TrackKind, enabled: bool },

    /// Flip the local track of `kind`.
    Toggle(TrackKind),

    /// Start or stop sending the screen instead of the camera.
    ToggleScreenShare,

    SendChat(String),

    Mute(ParticipantId),
    Kick(ParticipantId),
    Promote(ParticipantId),

    Leave,

    /// Posted by the watcher task when the screen source stops on its own.
    ScreenShareEnded(String),
}
