use crate::transport::media_connection::{
    ConnectionParams, ConnectionState, MediaConnection, MediaConnectionFactory, PeerEvent,
    SdpKind, TrackKind,
};
use crate::transport::rtc_config::RtcConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_core::{IceCandidate, IceServerConfig, SessionId};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

type SharedChannel = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Builds webrtc-rs peer connections.
pub struct RtcConnectionFactory {
    config: RtcConfig,
}

impl RtcConnectionFactory {
    pub fn new(config: RtcConfig) -> Self {
        Self { config }
    }

    fn ice_servers(&self, servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
        if servers.is_empty() {
            return vec![RTCIceServer {
                urls: self.config.fallback_ice_servers.clone(),
                ..Default::default()
            }];
        }

        servers
            .iter()
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone().unwrap_or_default(),
                credential: s.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect()
    }
}

impl Default for RtcConnectionFactory {
    fn default() -> Self {
        Self::new(RtcConfig::default())
    }
}

#[async_trait]
impl MediaConnectionFactory for RtcConnectionFactory {
    async fn connect(
        &self,
        params: ConnectionParams,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Box<dyn MediaConnection>> {
        let ice_servers = self.ice_servers(&params.ice_servers);
        let connection = RtcConnection::new(params, &self.config, ice_servers, events).await?;
        Ok(Box::new(connection))
    }
}

pub struct RtcConnection {
    session_id: SessionId,
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: SharedChannel,
}

impl RtcConnection {
    async fn new(
        params: ConnectionParams,
        config: &RtcConfig,
        ice_servers: Vec<RTCIceServer>,
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );
        let data_channel: SharedChannel = Arc::new(Mutex::new(None));
        let session_id = params.session_id;

        let state_tx = event_tx.clone();
        let sid_state = session_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let sid = sid_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", sid, s);
                    let _ = tx.send(PeerEvent::StateChanged(sid, map_state(s))).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let sid_ice = session_id.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let sid = sid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else {
                    debug!("ICE gathering complete for {}", sid);
                    let _ = tx.send(PeerEvent::GatheringComplete(sid)).await;
                    return;
                };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    sdp_mid: init.sdp_mid.unwrap_or_default(),
                    sdp_m_line_index: init.sdp_mline_index.unwrap_or_default(),
                    candidate: init.candidate,
                };
                let _ = tx.send(PeerEvent::CandidateGenerated(sid, candidate)).await;
            })
        }));

        let track_tx = event_tx.clone();
        let sid_track = session_id.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let tx = track_tx.clone();
            let sid = sid_track.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    RTPCodecType::Unspecified => return,
                };
                debug!("Remote {:?} track '{}' from {}", kind, track.id(), sid);
                let _ = tx.send(PeerEvent::TrackAdded(sid, kind, track.id())).await;
            })
        }));

        let dc_tx = event_tx.clone();
        let sid_dc = session_id.clone();
        let dc_slot = data_channel.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let sid = sid_dc.clone();
            let slot = dc_slot.clone();

            Box::pin(async move {
                debug!("Data channel '{}' opened by {}", dc.label(), sid);
                wire_data_channel(&dc, sid, tx);
                *slot.lock().await = Some(dc);
            })
        }));

        if let Some(media) = &params.local_media {
            let tracks: [Arc<dyn TrackLocal + Send + Sync>; 2] =
                [media.audio.clone(), media.video.clone()];
            for track in tracks {
                let rtp_sender = peer_connection
                    .add_track(track)
                    .await
                    .context("Failed to add local track")?;

                // RTCP must be drained for interceptors to work.
                tokio::spawn(async move {
                    let mut rtcp_buf = vec![0u8; 1500];
                    while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
                });
            }
        }

        if params.initiator {
            let dc = peer_connection
                .create_data_channel(&config.data_channel_label, None)
                .await
                .context("Failed to create data channel")?;
            wire_data_channel(&dc, session_id.clone(), event_tx);
            *data_channel.lock().await = Some(dc);
        }

        Ok(Self {
            session_id,
            peer_connection,
            data_channel,
        })
    }
}

fn wire_data_channel(dc: &Arc<RTCDataChannel>, session_id: SessionId, tx: mpsc::Sender<PeerEvent>) {
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        let sid = session_id.clone();
        Box::pin(async move {
            if !msg.is_string {
                return;
            }
            let _ = tx.send(PeerEvent::Message(sid, msg.data)).await;
        })
    }));
}

fn map_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
    }
}

#[async_trait]
impl MediaConnection for RtcConnection {
    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        self.peer_connection
            .set_remote_description(desc)
            .await
            .with_context(|| format!("Remote description rejected for {}", self.session_id))?;
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: Some(candidate.sdp_mid),
            sdp_mline_index: Some(candidate.sdp_m_line_index),
            username_fragment: None,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<()> {
        let Some(dc) = self.data_channel.lock().await.clone() else {
            warn!("No data channel to {} yet, dropping '{}'", self.session_id, text);
            return Ok(());
        };
        dc.send_text(text).await.context("Failed to send on data channel")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
