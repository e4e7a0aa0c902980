use crate::signaling::SessionId;
use liveroom_core::{ParticipantId, SignalMessage};

/// Команды, поступающие в комнату от WebSocket обработчика.
#[derive(Debug)]
pub enum RoomCommand {
    /// `join` или `create-room`: сессия входит в комнату.
    /// Без `user_id` сервер сам генерирует идентификатор.
    Join {
        session: SessionId,
        user_id: Option<ParticipantId>,
        username: Option<String>,
        create: bool,
    },

    /// Любое другое сообщение от участника комнаты.
    Signal {
        session: SessionId,
        msg: SignalMessage,
    },

    /// Сигнал о разрыве WebSocket соединения.
    Disconnect { session: SessionId },
}
