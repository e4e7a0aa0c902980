use async_trait::async_trait;
use liveroom_core::SignalMessage;
use liveroom_server::{SessionId, SignalingOutput};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Something the room asked the signaling layer to do.
#[derive(Debug, Clone)]
pub enum Captured {
    Sent(SessionId, SignalMessage),
    Closed(SessionId),
}

/// Mock SignalingOutput that captures everything the room sends.
#[derive(Clone, Default)]
pub struct MockSignalingOutput {
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockSignalingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered to `session`, oldest first.
    pub async fn sent_to(&self, session: &SessionId) -> Vec<SignalMessage> {
        self.captured
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                Captured::Sent(s, msg) if s == session => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn kinds_sent_to(&self, session: &SessionId) -> Vec<&'static str> {
        self.sent_to(session).await.iter().map(|m| m.kind()).collect()
    }

    pub async fn closed(&self) -> Vec<SessionId> {
        self.captured
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                Captured::Closed(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    /// Waits for the `nth` (0-based) message of `kind` sent to `session`.
    pub async fn wait_for_nth(
        &self,
        session: &SessionId,
        kind: &str,
        nth: usize,
        timeout_ms: u64,
    ) -> Option<SignalMessage> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            let found = self
                .sent_to(session)
                .await
                .into_iter()
                .filter(|m| m.kind() == kind)
                .nth(nth);
            if found.is_some() {
                return found;
            }
            if start.elapsed() > timeout {
                return None;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for(
        &self,
        session: &SessionId,
        kind: &str,
        timeout_ms: u64,
    ) -> Option<SignalMessage> {
        self.wait_for_nth(session, kind, 0, timeout_ms).await
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send(&self, session: &SessionId, msg: &SignalMessage) {
        tracing::debug!("[MockSignaling] `{}` to {}", msg.kind(), session);
        self.captured
            .lock()
            .await
            .push(Captured::Sent(*session, msg.clone()));
    }

    async fn close(&self, session: &SessionId) {
        tracing::debug!("[MockSignaling] close {}", session);
        self.captured.lock().await.push(Captured::Closed(*session));
    }
}
