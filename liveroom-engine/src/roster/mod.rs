use liveroom_core::{ConnectionQuality, ParticipantId, ParticipantSummary, TrackKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// A remote participant as seen by the local engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub is_host: bool,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub connection_quality: ConnectionQuality,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_host: false,
            video_enabled: true,
            audio_enabled: true,
            connection_quality: ConnectionQuality::Unknown,
        }
    }

    pub fn capability(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.video_enabled,
            TrackKind::Audio => self.audio_enabled,
        }
    }
}

impl From<ParticipantSummary> for Participant {
    fn from(summary: ParticipantSummary) -> Self {
        Self {
            id: summary.user_id,
            display_name: summary.username,
            is_host: summary.is_host,
            video_enabled: summary.is_video_enabled,
            audio_enabled: summary.is_audio_enabled,
            connection_quality: ConnectionQuality::Unknown,
        }
    }
}

/// Remote participants of the room. Self is never stored here.
///
/// Ordered by id so snapshots and iteration are deterministic.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole roster, skipping `self_id`. Returns the ids that
    /// were present before and are gone now.
    pub fn replace(
        &mut self,
        self_id: &ParticipantId,
        entries: impl IntoIterator<Item = Participant>,
    ) -> Vec<ParticipantId> {
        let next: BTreeMap<_, _> = entries
            .into_iter()
            .filter(|p| &p.id != self_id)
            .map(|p| (p.id.clone(), p))
            .collect();

        let removed = self
            .participants
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();

        self.participants = next;
        removed
    }

    /// Adds the participant unless the id is already known. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, participant: Participant) -> bool {
        if self.participants.contains_key(&participant.id) {
            return false;
        }
        self.participants.insert(participant.id.clone(), participant);
        true
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.participants.remove(id)
    }

    /// Returns the updated entry, or `None` for unknown ids.
    pub fn update_capability(
        &mut self,
        id: &ParticipantId,
        kind: TrackKind,
        enabled: bool,
    ) -> Option<&Participant> {
        let p = self.participants.get_mut(id)?;
        match kind {
            TrackKind::Video => p.video_enabled = enabled,
            TrackKind::Audio => p.audio_enabled = enabled,
        }
        Some(p)
    }

    /// Marks `host_id` as host and clears the flag on everyone else.
    pub fn set_host(&mut self, host_id: &ParticipantId) {
        for (id, p) in self.participants.iter_mut() {
            p.is_host = id == host_id;
        }
    }

    pub fn set_quality(
        &mut self,
        id: &ParticipantId,
        quality: ConnectionQuality,
    ) -> Option<&Participant> {
        let p = self.participants.get_mut(id)?;
        p.connection_quality = quality;
        Some(p)
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }
}
