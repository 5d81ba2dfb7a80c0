use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    /// Denied this time; asking again may succeed.
    Denied,
    /// Denied for good; only the system settings can grant it.
    PermanentlyDenied,
}

/// Local capture tracks shared by every peer connection of a call.
#[derive(Clone)]
pub struct LocalMedia {
    pub stream_id: String,
    pub audio: Arc<TrackLocalStaticSample>,
    pub video: Arc<TrackLocalStaticSample>,
}

impl LocalMedia {
    /// Opus audio plus VP8 video, fed by the host's capture pipeline.
    pub fn new() -> Self {
        let stream_id = format!("parley-{}", Uuid::new_v4());

        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.clone(),
        ));

        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90_000,
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.clone(),
        ));

        Self {
            stream_id,
            audio,
            video,
        }
    }
}

impl Default for LocalMedia {
    fn default() -> Self {
        Self::new()
    }
}

/// The device the call runs on: permissions, camera and microphone.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn request_permissions(&self) -> PermissionStatus;

    /// Sends the user to the system settings after a permanent denial.
    fn open_settings(&self);

    /// Starts camera and microphone capture and returns the tracks they feed.
    async fn start_capture(&self) -> Result<LocalMedia>;

    fn set_audio_enabled(&self, enabled: bool);

    /// Stops or restarts camera capture.
    fn set_video_enabled(&self, enabled: bool);

    fn switch_camera(&self);

    /// Stops capture and drops the local tracks.
    fn release(&self);
}
