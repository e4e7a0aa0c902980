mod session;
mod signaling_output;
mod signaling_service;
mod ws_handler;

pub use session::*;
pub use signaling_output::*;
pub use signaling_service::*;
pub use ws_handler::*;
