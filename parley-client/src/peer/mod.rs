mod peer_directory;
mod peer_registry;
mod peer_session;

pub use peer_directory::*;
pub use peer_registry::*;
pub use peer_session::*;
