use crate::signaling::{Outgoing, SessionId, SignalingOutput};
use async_trait::async_trait;
use dashmap::DashMap;
use liveroom_core::SignalMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct SignalingInner {
    sessions: DashMap<SessionId, mpsc::UnboundedSender<Outgoing>>,
}

/// Outbound queues of every open WebSocket session.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                sessions: DashMap::new(),
            }),
        }
    }

    pub fn add_session(&self, session: SessionId, tx: mpsc::UnboundedSender<Outgoing>) {
        self.inner.sessions.insert(session, tx);
    }

    pub fn remove_session(&self, session: &SessionId) {
        self.inner.sessions.remove(session);
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    fn push(&self, session: &SessionId, out: Outgoing) {
        let Some(tx) = self.inner.sessions.get(session) else {
            warn!("Attempted to reach disconnected {}", session);
            return;
        };
        if tx.send(out).is_err() {
            error!("Outbound queue of {} is gone", session);
        }
    }
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send(&self, session: &SessionId, msg: &SignalMessage) {
        match msg.encode() {
            Ok(json) => self.push(session, Outgoing::Text(json)),
            Err(e) => error!("Failed to serialize `{}`: {}", msg.kind(), e),
        }
    }

    async fn close(&self, session: &SessionId) {
        self.push(session, Outgoing::Close);
    }
}
