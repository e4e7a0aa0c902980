use crate::signaling::SessionId;
use async_trait::async_trait;
use liveroom_core::SignalMessage;

/// Трейт, через который комната отправляет сообщения клиентам.
/// Реализуется WebSocket сервером (и моками в тестах).
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Отправить сообщение конкретной сессии.
    async fn send(&self, session: &SessionId, msg: &SignalMessage);

    /// Закрыть соединение сессии (используется при `kick-user`).
    async fn close(&self, session: &SessionId);
}
