use crate::transport::media_host::LocalMedia;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use parley_core::{IceCandidate, IceServerConfig, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a media connection raises for the call loop.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local ICE candidate was discovered and must be signaled to the peer.
    CandidateGenerated(SessionId, IceCandidate),

    /// Local ICE gathering finished; no further candidates will follow.
    GatheringComplete(SessionId),

    /// The remote side attached a media track.
    TrackAdded(SessionId, TrackKind, String),

    /// Text frame received on the `status` data channel.
    Message(SessionId, Bytes),

    StateChanged(SessionId, ConnectionState),
}

/// Everything a new peer connection is bound to at construction time.
#[derive(Clone)]
pub struct ConnectionParams {
    pub session_id: SessionId,
    pub ice_servers: Arc<Vec<IceServerConfig>>,
    pub local_media: Option<LocalMedia>,
    /// The initiating side opens the data channel and sends the offer.
    pub initiator: bool,
}

/// One peer-to-peer media connection.
#[async_trait]
pub trait MediaConnection: Send + Sync {
    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    /// Creates an offer, installs it as the local description and returns its SDP.
    async fn create_offer(&self) -> Result<String>;

    /// Creates an answer, installs it as the local description and returns its SDP.
    async fn create_answer(&self) -> Result<String>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn send_text(&self, text: String) -> Result<()>;

    /// Must be safe to call on an already closed connection.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait MediaConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        params: ConnectionParams,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Box<dyn MediaConnection>>;
}
