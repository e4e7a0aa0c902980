use crate::error::{EngineError, Result};
use liveroom_core::SignalMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Frames delivered by the signaling transport to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    /// The transport closed. Carries the reason when one is known.
    Closed(Option<String>),
}

/// Frames the engine hands to the signaling transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Engine side of the signaling transport.
///
/// Cloning shares the open flag, so the transport task and the engine agree on
/// whether sends still make sense.
#[derive(Debug, Clone)]
pub struct SignalingChannel {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    open: Arc<AtomicBool>,
}

impl SignalingChannel {
    pub fn new(outbound: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            outbound,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Channel pair with no network behind it: the engine side plus the
    /// receiver of everything the engine sends and the sender of what it receives.
    pub fn in_memory() -> (
        Self,
        mpsc::UnboundedReceiver<OutboundFrame>,
        mpsc::Sender<InboundFrame>,
        mpsc::Receiver<InboundFrame>,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::channel(256);
        (Self::new(out_tx), out_rx, in_tx, in_rx)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    /// Marks the channel closed without asking the transport to close.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Asks the transport to close. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.outbound.send(OutboundFrame::Close);
        }
    }

    pub fn send(&self, msg: &SignalMessage) -> Result<()> {
        if !self.is_open() {
            return Err(EngineError::SignalingTransport(format!(
                "channel closed, dropping `{}`",
                msg.kind()
            )));
        }

        let json = msg.encode().map_err(|e| {
            error!("Failed to serialize signal message: {}", e);
            EngineError::protocol(e.to_string())
        })?;
        debug!("-> {}", json);

        self.outbound.send(OutboundFrame::Text(json)).map_err(|_| {
            self.mark_closed();
            EngineError::SignalingTransport("transport task is gone".into())
        })
    }

    pub fn decode(text: &str) -> Result<SignalMessage> {
        SignalMessage::decode(text).map_err(|e| EngineError::protocol(e.to_string()))
    }
}
