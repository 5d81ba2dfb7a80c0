use parley_core::SessionId;
use parley_core::wire::WireError;
use thiserror::Error;

/// Failure of one request against the signaling relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("credentials rejected by the relay")]
    Unauthorized,

    #[error("undecodable relay response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether retrying the same request can help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}

impl From<WireError> for TransportError {
    fn from(e: WireError) -> Self {
        Self::Decode(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("camera/microphone permission denied (permanent: {permanent})")]
    PermissionDenied { permanent: bool },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("protocol error with peer {session_id}: {reason}")]
    Protocol { session_id: SessionId, reason: String },

    #[error("local media unavailable: {0}")]
    Media(String),

    #[error("call loop has shut down")]
    Closed,
}

impl CallError {
    pub fn protocol(session_id: &SessionId, err: impl std::fmt::Display) -> Self {
        Self::Protocol {
            session_id: session_id.clone(),
            reason: format!("{err:#}"),
        }
    }
}
