mod channel;
mod outbound;
pub mod ws_client;

pub use channel::{InboundFrame, OutboundFrame, SignalingChannel};
pub use outbound::Outbound;
