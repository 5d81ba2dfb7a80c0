use crate::call::call_state::CallState;
use crate::error::CallError;
use crate::transport::TrackKind;
use parley_core::SessionId;

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    StateChanged(CallState),

    PeerJoined(SessionId),
    PeerLeft(SessionId),

    RemoteStreamAttached {
        session_id: SessionId,
        kind: TrackKind,
        track_id: String,
    },
    RemoteStreamDetached(SessionId),

    NickChanged(SessionId, String),
    RemoteAudioChanged(SessionId, bool),
    RemoteVideoChanged(SessionId, bool),

    /// The media connection to this peer failed or was closed remotely.
    ConnectionClosed(SessionId),

    PermissionDenied { permanent: bool },

    /// The relay rejected our credentials; the user must sign in again.
    AuthorizationRequired,

    Failed(CallError),

    /// The call loop has finished.
    Closed,
}
