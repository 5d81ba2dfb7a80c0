use serde::Deserialize;
use std::time::Duration;

/// Settings of one call. Missing fields fall back to [`CallConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    pub room_token: String,
    /// Nick sent along with offers and answers. Empty means none.
    pub display_name: String,
    pub ping_interval_ms: u64,
    pub pull_interval_ms: u64,
    /// Consecutive failures a pump tolerates before it stops.
    pub pump_retries: u32,
    pub send_retries: u32,
    /// Pause between two tries of the same outbound batch.
    pub send_retry_delay_ms: u64,
    pub preferred_video_codec: String,
    /// Permission prompts shown before a transient denial becomes final.
    pub permission_requests: u32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            room_token: String::new(),
            display_name: String::new(),
            ping_interval_ms: 5000,
            pull_interval_ms: 1500,
            pump_retries: 3,
            send_retries: 3,
            send_retry_delay_ms: 500,
            preferred_video_codec: "VP8".to_owned(),
            permission_requests: 2,
        }
    }
}

impl CallConfig {
    pub fn new(room_token: impl Into<String>) -> Self {
        Self {
            room_token: room_token.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pull_interval(&self) -> Duration {
        Duration::from_millis(self.pull_interval_ms)
    }

    pub fn send_retry_delay(&self) -> Duration {
        Duration::from_millis(self.send_retry_delay_ms)
    }

    pub fn nick(&self) -> Option<&str> {
        Some(self.display_name.as_str()).filter(|n| !n.is_empty())
    }
}
