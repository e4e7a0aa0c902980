use crate::coordinator::inbound::now_millis;
use crate::coordinator::{ChatMessage, EndReason, Engine, EngineCommand, EngineEvent};
use crate::error::EngineError;
use crate::host::HostAction;
use crate::media::LocalTrack;
use liveroom_core::{ParticipantId, SignalBody, TrackKind};
use tracing::{info, warn};

impl Engine {
    pub(super) async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SetCapability { kind, enabled } => {
                self.apply_capability(kind, enabled).await
            }
            EngineCommand::Toggle(kind) => {
                let enabled = !self.media.is_enabled(kind);
                self.apply_capability(kind, enabled).await
            }
            EngineCommand::ToggleScreenShare => {
                if self.media.is_screen_sharing() {
                    self.stop_screen_share().await
                } else {
                    self.start_screen_share().await
                }
            }
            EngineCommand::ScreenShareEnded(track_id) => {
                if self.media.screen().is_some_and(|t| t.id() == track_id) {
                    info!("Screen source ended, reverting to camera");
                    self.stop_screen_share().await
                }
            }
            EngineCommand::SendChat(content) => self.send_chat(content),
            EngineCommand::Mute(target) => self.host_action(HostAction::Mute, target),
            EngineCommand::Kick(target) => self.host_action(HostAction::Kick, target),
            EngineCommand::Promote(target) => self.host_action(HostAction::Promote, target),
            EngineCommand::Leave => self.end_session(EndReason::Left).await,
        }
    }

    /// Turns the local track of `kind` on or off and tells the room.
    ///
    /// An existing track is flipped in place. A missing track is acquired and
    /// attached to every link only when enabling.
    pub(super) async fn apply_capability(&mut self, kind: TrackKind, enabled: bool) {
        if let Some(track) = self.media.track(kind) {
            track.set_enabled(enabled);
        } else if enabled {
            let Some(track) = self.acquire(kind).await else {
                return;
            };
            self.media.set_track(track.clone());
            if !(kind == TrackKind::Video && self.media.is_screen_sharing()) {
                self.attach_everywhere(&track).await;
            }
        }

        self.media.set_enabled(kind, enabled);
        let body = match kind {
            TrackKind::Video => SignalBody::ToggleVideo { enabled },
            TrackKind::Audio => SignalBody::ToggleAudio { enabled },
        };
        if let Err(e) = self.out.broadcast(body) {
            self.report(e);
        }
        self.events
            .emit(EngineEvent::LocalCapabilityChanged { kind, enabled });
    }

    async fn acquire(&self, kind: TrackKind) -> Option<LocalTrack> {
        let video = kind == TrackKind::Video;
        match self.capture.acquire(video, !video).await {
            Ok(mut bundle) => match bundle.take(kind) {
                Some(track) => Some(track),
                None => {
                    self.report(EngineError::Device(format!("capture returned no {kind} track")));
                    None
                }
            },
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    async fn attach_everywhere(&mut self, track: &LocalTrack) {
        for e in self.links.attach_track(track).await {
            self.report(e);
        }
    }

    async fn start_screen_share(&mut self) {
        let screen = match self.capture.acquire_display().await {
            Ok(mut bundle) => bundle.take(TrackKind::Video),
            Err(e) => return self.report(e),
        };
        let Some(screen) = screen else {
            return self.report(EngineError::Device("display capture returned no video".into()));
        };

        self.media.set_screen(screen.clone());
        self.attach_everywhere(&screen).await;

        let commands = self.command_tx.clone();
        tokio::spawn(async move {
            if screen.ended().await {
                let _ = commands
                    .send(EngineCommand::ScreenShareEnded(screen.id().to_owned()))
                    .await;
            }
        });

        info!("Screen sharing started");
        self.events.emit(EngineEvent::ScreenShareChanged(true));
    }

    async fn stop_screen_share(&mut self) {
        let Some(screen) = self.media.take_screen() else {
            return;
        };
        screen.set_enabled(false);

        let camera = match self.media.track(TrackKind::Video).cloned() {
            Some(camera) => Some(camera),
            None => {
                let acquired = self.acquire(TrackKind::Video).await;
                if let Some(camera) = &acquired {
                    camera.set_enabled(self.media.is_enabled(TrackKind::Video));
                    self.media.set_track(camera.clone());
                }
                acquired
            }
        };
        match camera {
            Some(camera) => self.attach_everywhere(&camera).await,
            None => warn!("No camera to return to after screen sharing"),
        }

        info!("Screen sharing stopped");
        self.events.emit(EngineEvent::ScreenShareChanged(false));
    }

    fn send_chat(&self, content: String) {
        if content.trim().is_empty() {
            return;
        }
        let username = self.config.display_name.clone();
        let body = SignalBody::Chat {
            username: Some(username.clone()),
            content: content.clone(),
        };
        if let Err(e) = self.out.broadcast(body) {
            return self.report(e);
        }

        self.events.emit(EngineEvent::ChatReceived(ChatMessage {
            from: self.self_id().clone(),
            username,
            content,
            sent_at_millis: now_millis(),
            is_own: true,
        }));
    }

    fn host_action(&self, action: HostAction, target: ParticipantId) {
        let known = self.roster.contains(&target);
        if let Err(denied) = self.host.permits(self.self_id(), &target, known) {
            warn!("{} of {} not sent: {:?}", action.as_str(), target, denied);
            return;
        }

        let body = match action {
            HostAction::Mute => SignalBody::MuteUser,
            HostAction::Kick => SignalBody::KickUser,
            HostAction::Promote => SignalBody::MakeHost,
        };
        info!("Requesting {} of {}", action.as_str(), target);
        if let Err(e) = self.out.send_to(&target, body) {
            self.report(e);
        }
    }
}
