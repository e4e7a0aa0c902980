pub mod mock_capture;
pub mod mock_transport;

pub use engine_harness::*;
pub use mock_capture::*;
pub use mock_transport::*;
pub use relay::*;
