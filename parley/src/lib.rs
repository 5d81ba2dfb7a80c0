pub use parley_core::model::SessionId;

pub mod model {
    pub use parley_core::model::*;
    pub use parley_core::{sdp, wire};
}

#[cfg(feature = "client")]
pub mod client {
    pub use parley_client::*;
}
