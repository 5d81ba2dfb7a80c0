mod data_channel;
mod ice;
mod roster;
mod session;
mod signaling;

pub use data_channel::{DataChannelMessage, MediaToggle};
pub use ice::{IceCandidate, IceServerConfig};
pub use roster::{RosterEntry, RosterSnapshot};
pub use session::SessionId;
pub use signaling::{Signal, SignalKind, SignalPayload, SignalingMessage, VIDEO_ROOM_TYPE};
