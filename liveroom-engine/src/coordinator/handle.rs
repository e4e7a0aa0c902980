use crate::coordinator::command::EngineCommand;
use crate::coordinator::event::{EngineEvent, EventSink};
use crate::peer::LinkState;
use crate::roster::Participant;
use liveroom_core::{ParticipantId, RoomId, TrackKind};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;

/// Point-in-time view of the engine, published after every processed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub self_id: ParticipantId,
    pub room_id: RoomId,
    pub connected: bool,
    pub ended: bool,
    pub is_host: bool,
    pub host_id: Option<ParticipantId>,
    pub roster: Vec<Participant>,
    pub links: BTreeMap<ParticipantId, LinkState>,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub screen_sharing: bool,
}

impl EngineSnapshot {
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.roster.iter().find(|p| &p.id == id)
    }

    pub fn link_state(&self, id: &ParticipantId) -> Option<LinkState> {
        self.links.get(id).copied()
    }
}

/// Cloneable front door to a running engine.
///
/// Intents sent after the session ended are dropped.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    self_id: ParticipantId,
    commands: mpsc::Sender<EngineCommand>,
    events: EventSink,
    state: watch::Receiver<EngineSnapshot>,
}

impl EngineHandle {
    pub(crate) fn new(
        self_id: ParticipantId,
        commands: mpsc::Sender<EngineCommand>,
        events: EventSink,
        state: watch::Receiver<EngineSnapshot>,
    ) -> Self {
        Self {
            self_id,
            commands,
            events,
            state,
        }
    }

    pub fn self_id(&self) -> &ParticipantId {
        &self.self_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state.borrow().clone()
    }

    /// Waits until the published snapshot satisfies `pred`. Returns `None` if
    /// the engine stopped first.
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(&EngineSnapshot) -> bool,
    ) -> Option<EngineSnapshot> {
        let mut rx = self.state.clone();
        let found = rx.wait_for(|s| pred(s)).await.ok().map(|s| s.clone());
        found
    }

    pub async fn command(&self, cmd: EngineCommand) {
        if self.commands.send(cmd).await.is_err() {
            debug!("Engine stopped, intent dropped");
        }
    }

    pub async fn set_capability(&self, kind: TrackKind, enabled: bool) {
        self.command(EngineCommand::SetCapability { kind, enabled })
            .await
    }

    pub async fn toggle_video(&self) {
        self.command(EngineCommand::Toggle(TrackKind::Video)).await
    }

    pub async fn toggle_audio(&self) {
        self.command(EngineCommand::Toggle(TrackKind::Audio)).await
    }

    pub async fn toggle_screen_share(&self) {
        self.command(EngineCommand::ToggleScreenShare).await
    }

    pub async fn send_chat(&self, content: impl Into<String>) {
        self.command(EngineCommand::SendChat(content.into())).await
    }

    pub async fn mute(&self, target: ParticipantId) {
        self.command(EngineCommand::Mute(target)).await
    }

    pub async fn kick(&self, target: ParticipantId) {
        self.command(EngineCommand::Kick(target)).await
    }

    pub async fn promote(&self, target: ParticipantId) {
        self.command(EngineCommand::Promote(target)).await
    }

    pub async fn leave(&self) {
        self.command(EngineCommand::Leave).await
    }
}
