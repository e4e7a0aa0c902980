use crate::room::RoomCommand;
use crate::signaling::{SessionId, SignalingOutput};
use liveroom_core::{ParticipantId, ParticipantSummary, RoomId, SignalBody, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct Member {
    id: ParticipantId,
    session: SessionId,
    username: String,
}

/// How a client message leaves the room.
enum Route {
    /// To `to` if set, otherwise to everyone else.
    Direct,
    /// To everyone else, with the sender's identity stamped on.
    Others,
    Moderation(Moderation),
    Rejected,
}

#[derive(Debug, Clone, Copy)]
enum Moderation {
    Mute,
    Kick,
    Promote,
}

/// Single-writer state of one room: members in join order and the current host.
pub struct Room {
    room_id: RoomId,
    members: Vec<Member>,
    host: Option<ParticipantId>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            room_id,
            members: Vec::new(),
            host: None,
            command_rx,
            signaling,
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.room_id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Shutting down room {}.", self.room_id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                session,
                user_id,
                username,
                create,
            } => self.handle_join(session, user_id, username, create).await,

            RoomCommand::Signal { session, msg } => self.handle_signal(session, msg).await,

            RoomCommand::Disconnect { session } => {
                self.remove_member(&session).await;
            }
        }
    }

    async fn handle_join(
        &mut self,
        session: SessionId,
        user_id: Option<ParticipantId>,
        username: Option<String>,
        create: bool,
    ) {
        if self.members.iter().any(|m| m.session == session) {
            warn!("{} joined room {} twice", session, self.room_id);
            return;
        }

        let id = user_id.unwrap_or_else(ParticipantId::generate);
        let username = username.unwrap_or_else(|| default_username(&id));

        if let Some(pos) = self.members.iter().position(|m| m.id == id) {
            let stale = self.members.remove(pos);
            warn!(
                "{} rejoined room {} from {}, closing {}",
                id, self.room_id, session, stale.session
            );
            self.signaling.close(&stale.session).await;
        }

        if create || self.host.is_none() {
            self.host = Some(id.clone());
        }
        self.members.push(Member {
            id: id.clone(),
            session,
            username: username.clone(),
        });
        info!("{} ({}) joined room {}", id, username, self.room_id);

        let joined = SignalMessage::new(SignalBody::UserJoined {
            username: Some(username.clone()),
        })
        .sent_by(id.clone());
        self.broadcast(Some(&id), joined).await;

        let others = self
            .members
            .iter()
            .filter(|m| m.id != id)
            .map(|m| ParticipantSummary::new(m.id.clone(), m.username.clone()))
            .collect();
        self.send_to(&session, SignalMessage::new(SignalBody::UsersList(others)))
            .await;

        let success = SignalMessage::new(SignalBody::JoinSuccess {
            username: Some(username),
            is_host: self.host.as_ref() == Some(&id),
            host_id: self.host.clone(),
        })
        .sent_by(id);
        self.send_to(&session, success).await;

        if !create && let Some(host_id) = self.host.clone() {
            self.broadcast(None, SignalMessage::new(SignalBody::HostUpdated { host_id }))
                .await;
        }
    }

    async fn handle_signal(&mut self, session: SessionId, mut msg: SignalMessage) {
        let Some((sender, name)) = self
            .member_by_session(&session)
            .map(|m| (m.id.clone(), m.username.clone()))
        else {
            debug!("Dropping `{}` from {}: not a member", msg.kind(), session);
            return;
        };
        msg.from = Some(sender.clone());

        let route = match &msg.body {
            SignalBody::Offer(_) | SignalBody::Answer(_) | SignalBody::IceCandidate(_) => {
                Route::Direct
            }
            SignalBody::Chat { .. } | SignalBody::ToggleVideo { .. } | SignalBody::ToggleAudio { .. } => {
                Route::Others
            }
            SignalBody::MuteUser => Route::Moderation(Moderation::Mute),
            SignalBody::KickUser => Route::Moderation(Moderation::Kick),
            SignalBody::MakeHost => Route::Moderation(Moderation::Promote),
            _ => Route::Rejected,
        };

        match route {
            Route::Direct => self.forward(msg).await,
            Route::Others => {
                if let SignalBody::Chat { username, .. } = &mut msg.body {
                    *username = Some(name);
                }
                self.broadcast(Some(&sender), msg).await;
            }
            Route::Moderation(action) => self.moderate(&sender, action, msg).await,
            Route::Rejected => {
                warn!("Dropping `{}` from {}: relay-only message", msg.kind(), sender);
            }
        }
    }

    async fn forward(&self, msg: SignalMessage) {
        let Some(to) = &msg.to else {
            let from = msg.from.clone();
            return self.broadcast(from.as_ref(), msg).await;
        };
        match self.member(to) {
            Some(target) => self.send_to(&target.session, msg.clone()).await,
            None => debug!("Dropping `{}` for {}: not in room {}", msg.kind(), to, self.room_id),
        }
    }

    async fn moderate(&mut self, sender: &ParticipantId, action: Moderation, msg: SignalMessage) {
        if self.host.as_ref() != Some(sender) {
            warn!("Non-host {} attempted {:?} in room {}", sender, action, self.room_id);
            return;
        }
        let Some(target) = msg.to.clone() else {
            warn!("{:?} from {} without a target", action, sender);
            return;
        };
        let Some(target_session) = self.member(&target).map(|m| m.session) else {
            warn!("{:?} target {} is not in room {}", action, target, self.room_id);
            return;
        };

        match action {
            Moderation::Mute => {
                self.send_to(&target_session, msg).await;
                let muted = SignalMessage::new(SignalBody::UserMuted {
                    audio_enabled: false,
                })
                .sent_by(target);
                self.broadcast(None, muted).await;
            }
            Moderation::Kick => {
                self.send_to(&target_session, msg).await;
                info!("{} removed {} from room {}", sender, target, self.room_id);
                self.signaling.close(&target_session).await;
                self.remove_member(&target_session).await;
            }
            Moderation::Promote => {
                info!("{} handed host of room {} to {}", sender, self.room_id, target);
                self.host = Some(target.clone());
                self.broadcast(None, SignalMessage::new(SignalBody::HostUpdated { host_id: target }))
                    .await;
            }
        }
    }

    /// Drops the member behind `session`, tells the others and passes the host
    /// role on to the earliest-joined remaining member.
    async fn remove_member(&mut self, session: &SessionId) {
        let Some(pos) = self.members.iter().position(|m| &m.session == session) else {
            debug!("{} left room {} before joining", session, self.room_id);
            return;
        };
        let member = self.members.remove(pos);
        info!("{} left room {}", member.id, self.room_id);

        let left = SignalMessage::new(SignalBody::UserLeft).sent_by(member.id.clone());
        self.broadcast(None, left).await;

        if self.host.as_ref() == Some(&member.id) {
            self.host = self.members.first().map(|m| m.id.clone());
            if let Some(host_id) = self.host.clone() {
                info!("Host of room {} passed to {}", self.room_id, host_id);
                self.broadcast(None, SignalMessage::new(SignalBody::HostUpdated { host_id }))
                    .await;
            }
        }
    }

    fn member(&self, id: &ParticipantId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    fn member_by_session(&self, session: &SessionId) -> Option<&Member> {
        self.members.iter().find(|m| &m.session == session)
    }

    async fn send_to(&self, session: &SessionId, msg: SignalMessage) {
        let msg = msg.in_room(self.room_id.clone());
        self.signaling.send(session, &msg).await;
    }

    /// Sends to every member except `except`.
    async fn broadcast(&self, except: Option<&ParticipantId>, msg: SignalMessage) {
        let msg = msg.in_room(self.room_id.clone());
        for member in self.members.iter().filter(|m| Some(&m.id) != except) {
            self.signaling.send(&member.session, &msg).await;
        }
    }
}

fn default_username(id: &ParticipantId) -> String {
    let short: String = id.as_str().chars().take(8).collect();
    format!("user {short}")
}
