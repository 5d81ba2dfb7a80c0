use crate::error::TransportError;
use async_trait::async_trait;
use parley_core::{IceServerConfig, SessionId, Signal, SignalingMessage};

/// Request/response surface of the HTTP signaling relay.
///
/// Implementations own the HTTP client, credentials and the envelope codec
/// in [`parley_core::wire`]; the call core only sees decoded signals.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServerConfig>, TransportError>;

    /// Enters the room and returns the session id assigned to this device.
    async fn join_room(&self, token: &str) -> Result<SessionId, TransportError>;

    async fn join_call(&self, token: &str) -> Result<(), TransportError>;

    async fn leave_call(&self, token: &str) -> Result<(), TransportError>;

    async fn leave_room(&self, token: &str) -> Result<(), TransportError>;

    /// Long-polls for roster snapshots and peer messages, in delivery order.
    async fn pull_signaling(&self, token: &str) -> Result<Vec<Signal>, TransportError>;

    /// Pushes outbound messages. The relay may answer with signals to process.
    async fn send_signaling(
        &self,
        token: &str,
        messages: Vec<SignalingMessage>,
    ) -> Result<Vec<Signal>, TransportError>;

    async fn ping_call(&self, token: &str) -> Result<(), TransportError>;
}
