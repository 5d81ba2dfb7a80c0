mod call;
mod error;
mod peer;
mod presence;
mod signaling;
mod transport;

pub use call::*;
pub use error::*;
pub use peer::*;
pub use presence::*;
pub use signaling::*;
pub use transport::*;
