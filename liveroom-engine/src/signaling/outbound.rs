use crate::error::Result;
use crate::signaling::SignalingChannel;
use liveroom_core::{ParticipantId, RoomId, SignalBody, SignalMessage};

/// Sending half used by the engine. Stamps `from` and `roomId` on everything.
#[derive(Debug, Clone)]
pub struct Outbound {
    channel: SignalingChannel,
    self_id: ParticipantId,
    room_id: RoomId,
}

impl Outbound {
    pub fn new(channel: SignalingChannel, self_id: ParticipantId, room_id: RoomId) -> Self {
        Self {
            channel,
            self_id,
            room_id,
        }
    }

    pub fn self_id(&self) -> &ParticipantId {
        &self.self_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn close(&self) {
        self.channel.close();
    }

    fn message(&self, body: SignalBody) -> SignalMessage {
        SignalMessage::new(body)
            .sent_by(self.self_id.clone())
            .in_room(self.room_id.clone())
    }

    pub fn send_to(&self, peer: &ParticipantId, body: SignalBody) -> Result<()> {
        self.channel
            .send(&self.message(body).addressed_to(peer.clone()))
    }

    pub fn broadcast(&self, body: SignalBody) -> Result<()> {
        self.channel.send(&self.message(body))
    }
}
