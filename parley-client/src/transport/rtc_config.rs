/// Settings for the webrtc-rs backed connection factory.
#[derive(Clone)]
pub struct RtcConfig {
    /// Used when the relay hands out no ICE servers at all.
    pub fallback_ice_servers: Vec<String>,
    pub data_channel_label: String,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            fallback_ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
            data_channel_label: "status".to_owned(),
        }
    }
}
