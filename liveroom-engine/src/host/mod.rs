use liveroom_core::ParticipantId;

/// Moderation actions a host can take on another participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Mute,
    Kick,
    Promote,
}

impl HostAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HostAction::Mute => "mute",
            HostAction::Kick => "kick",
            HostAction::Promote => "promote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denied {
    NotHost,
    TargetIsSelf,
    UnknownTarget,
}

/// Gates host actions on the local host flag. The flag only changes through
/// `join-success` and `host-updated`.
#[derive(Debug, Default, Clone)]
pub struct HostPolicy {
    self_is_host: bool,
    host_id: Option<ParticipantId>,
}

impl HostPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_host(&self) -> bool {
        self.self_is_host
    }

    pub fn host_id(&self) -> Option<&ParticipantId> {
        self.host_id.as_ref()
    }

    /// Applies the outcome of the join handshake.
    pub fn apply_join(&mut self, self_id: &ParticipantId, is_host: bool, host_id: Option<ParticipantId>) {
        self.self_is_host = is_host;
        self.host_id = match (host_id, is_host) {
            (Some(id), _) => Some(id),
            (None, true) => Some(self_id.clone()),
            (None, false) => None,
        };
    }

    /// Returns true when the local host flag changed.
    pub fn apply_host_updated(&mut self, self_id: &ParticipantId, host_id: ParticipantId) -> bool {
        let was_host = self.self_is_host;
        self.self_is_host = &host_id == self_id;
        self.host_id = Some(host_id);
        was_host != self.self_is_host
    }

    pub fn permits(
        &self,
        self_id: &ParticipantId,
        target: &ParticipantId,
        target_known: bool,
    ) -> Result<(), Denied> {
        if !self.self_is_host {
            return Err(Denied::NotHost);
        }
        if target == self_id {
            return Err(Denied::TargetIsSelf);
        }
        if !target_known {
            return Err(Denied::UnknownTarget);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.self_is_host = false;
        self.host_id = None;
    }
}
