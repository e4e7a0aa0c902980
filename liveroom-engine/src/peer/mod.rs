mod link;
mod manager;
pub mod rtc;
mod state;
mod transport;

pub use link::PeerLink;
pub use manager::{OfferOutcome, PeerLinkManager};
pub use state::{InvalidTransition, LinkInput, LinkState, transition};
pub use transport::{LinkId, PeerTransport, PeerTransportFactory, TransportEvent, TransportState};
