use crate::coordinator::{ChatMessage, EndReason, Engine, EngineEvent};
use crate::error::{EngineError, Result};
use crate::peer::{LinkState, OfferOutcome};
use crate::roster::Participant;
use crate::signaling::SignalingChannel;
use liveroom_core::{ParticipantId, ParticipantSummary, SignalBody, SignalMessage, TrackKind};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl Engine {
    pub(super) async fn handle_text(&mut self, text: &str) {
        debug!("<- {}", text);
        let msg = match SignalingChannel::decode(text) {
            Ok(msg) => msg,
            Err(e) => return self.report(e),
        };
        if let Err(e) = self.handle_signal(msg).await {
            self.report(e);
        }
    }

    async fn handle_signal(&mut self, msg: SignalMessage) -> Result<()> {
        let self_id = self.self_id().clone();

        if let Some(to) = &msg.to
            && to != &self_id
        {
            return Err(EngineError::protocol(format!(
                "`{}` addressed to {} reached {}",
                msg.kind(),
                to,
                self_id
            )));
        }
        // join-success is stamped with our own id by the relay
        if msg.from.as_ref() == Some(&self_id) && !matches!(msg.body, SignalBody::JoinSuccess { .. }) {
            debug!("Ignoring own `{}` echo", msg.kind());
            return Ok(());
        }

        let kind = msg.kind();
        let from = msg.from;
        let sender = || {
            from.clone()
                .ok_or_else(|| EngineError::protocol(format!("`{kind}` without a sender")))
        };

        match msg.body {
            SignalBody::JoinSuccess {
                is_host, host_id, ..
            } => {
                self.host.apply_join(&self_id, is_host, host_id);
                if let Some(host_id) = self.host.host_id().cloned() {
                    self.roster.set_host(&host_id);
                }
                info!("Joined room {} (host: {})", self.out.room_id(), is_host);
                self.events.emit(EngineEvent::JoinedRoom {
                    self_id,
                    is_host,
                    host_id: self.host.host_id().cloned(),
                });
            }

            SignalBody::UsersList(users) => self.on_roster_snapshot(users).await,

            SignalBody::UserJoined { username } => {
                let id = sender()?;
                let name = username.unwrap_or_else(|| id.to_string());
                self.on_participant_joined(id, name).await;
            }

            SignalBody::UserLeft => self.on_participant_left(&sender()?).await,

            SignalBody::Offer(offer) => {
                let from = sender()?;
                let tracks = self.media.outgoing();
                let outcome = self
                    .links
                    .handle_offer(&self_id, &from, offer, &tracks, &self.out)
                    .await?;
                if outcome == OfferOutcome::Answered {
                    self.emit_link_state(&from);
                }
            }

            SignalBody::Answer(answer) => {
                let from = sender()?;
                self.links.handle_answer(&from, answer).await?;
                self.emit_link_state(&from);
            }

            SignalBody::IceCandidate(candidate) => {
                self.links.handle_candidate(&sender()?, candidate).await?
            }

            SignalBody::ToggleVideo { enabled } => {
                self.on_remote_capability(&sender()?, TrackKind::Video, enabled)
            }

            SignalBody::ToggleAudio { enabled } => {
                self.on_remote_capability(&sender()?, TrackKind::Audio, enabled)
            }

            SignalBody::UserMuted { audio_enabled } => {
                self.on_remote_capability(&sender()?, TrackKind::Audio, audio_enabled)
            }

            SignalBody::MuteUser => {
                if msg.to.is_none() {
                    return Err(EngineError::protocol("`mute-user` without a target"));
                }
                info!("Muted by {}", sender()?);
                self.apply_capability(TrackKind::Audio, false).await;
            }

            SignalBody::KickUser => {
                if msg.to.is_none() {
                    return Err(EngineError::protocol("`kick-user` without a target"));
                }
                info!("Removed from the room by {}", sender()?);
                self.end_session(EndReason::Kicked).await;
            }

            SignalBody::MakeHost => {
                debug!("`make-host` is applied by the relay; waiting for `host-updated`");
            }

            SignalBody::HostUpdated { host_id } => {
                self.host.apply_host_updated(&self_id, host_id.clone());
                self.roster.set_host(&host_id);
                info!("Host is now {}", host_id);
                self.events.emit(EngineEvent::HostChanged {
                    self_is_host: self.host.is_host(),
                    host_id,
                });
            }

            SignalBody::Chat { username, content } => {
                let from = sender()?;
                let username = username
                    .or_else(|| self.roster.get(&from).map(|p| p.display_name.clone()))
                    .unwrap_or_else(|| from.to_string());
                self.events.emit(EngineEvent::ChatReceived(ChatMessage {
                    from,
                    username,
                    content,
                    sent_at_millis: now_millis(),
                    is_own: false,
                }));
            }

            SignalBody::CreateRoom { .. } | SignalBody::Join { .. } => {
                return Err(EngineError::protocol(format!(
                    "`{kind}` is only sent to the relay"
                )));
            }
        }

        Ok(())
    }

    async fn on_roster_snapshot(&mut self, users: Vec<ParticipantSummary>) {
        let self_id = self.self_id().clone();
        self.roster
            .replace(&self_id, users.into_iter().map(Participant::from));
        if let Some(host_id) = self.host.host_id().cloned() {
            self.roster.set_host(&host_id);
        }

        for peer in self.links.peers() {
            if !self.roster.contains(&peer) {
                self.drop_link(&peer).await;
            }
        }
        self.events
            .emit(EngineEvent::RosterReplaced(self.roster.snapshot()));

        for peer in self.roster.ids() {
            if !self.links.contains(&peer) && self_id.initiates_with(&peer) {
                self.initiate(&peer).await;
            }
        }
    }

    async fn on_participant_joined(&mut self, id: ParticipantId, name: String) {
        let self_id = self.self_id().clone();

        let participant = Participant::new(id.clone(), name);
        if self.roster.insert_if_absent(participant.clone()) {
            info!("{} joined", id);
            self.events.emit(EngineEvent::ParticipantJoined(participant));
        }

        if let Some(state) = self.links.state(&id)
            && state != LinkState::Stable
        {
            info!("Tearing down {} link to rejoined {}", state, id);
            self.drop_link(&id).await;
        }

        if self_id.initiates_with(&id) && !self.links.contains(&id) {
            self.initiate(&id).await;
        }
    }

    async fn on_participant_left(&mut self, id: &ParticipantId) {
        self.drop_link(id).await;
        if self.roster.remove(id).is_some() {
            info!("{} left", id);
            self.events.emit(EngineEvent::ParticipantLeft(id.clone()));
        }
    }

    fn on_remote_capability(&mut self, id: &ParticipantId, kind: TrackKind, enabled: bool) {
        match self.roster.update_capability(id, kind, enabled) {
            Some(p) => {
                let updated = p.clone();
                self.events.emit(EngineEvent::ParticipantUpdated(updated));
            }
            None => debug!("Capability change from unknown participant {}", id),
        }
    }

    async fn initiate(&mut self, peer: &ParticipantId) {
        let tracks = self.media.outgoing();
        match self.links.initiate(peer, &tracks, &self.out).await {
            Ok(()) => self.emit_link_state(peer),
            Err(e) => self.report(e),
        }
    }
}
