pub use liveroom_core::model::{ParticipantId, RoomId};

pub mod model {
    pub use liveroom_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use liveroom_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use liveroom_engine::*;
}
