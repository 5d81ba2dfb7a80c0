use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaToggle {
    AudioOn,
    AudioOff,
    VideoOn,
    VideoOff,
}

impl MediaToggle {
    pub fn audio(enabled: bool) -> Self {
        if enabled { Self::AudioOn } else { Self::AudioOff }
    }

    pub fn video(enabled: bool) -> Self {
        if enabled { Self::VideoOn } else { Self::VideoOff }
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::VideoOn | Self::VideoOff)
    }

    pub fn enabled(self) -> bool {
        matches!(self, Self::AudioOn | Self::VideoOn)
    }
}

/// Out-of-band text message exchanged over the `status` data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChannelMessage {
    #[serde(rename = "type")]
    pub toggle: MediaToggle,
}

impl DataChannelMessage {
    pub fn new(toggle: MediaToggle) -> Self {
        Self { toggle }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
