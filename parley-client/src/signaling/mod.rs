mod signaling_transport;

pub use signaling_transport::*;
