use serde::{Deserialize, Serialize};

/// One relay/traversal server handed to every peer connection of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// Keeps the credential pair only when both halves are non-empty.
    pub fn with_credentials(
        url: impl Into<String>,
        username: Option<String>,
        credential: Option<String>,
    ) -> Self {
        match (username, credential) {
            (Some(u), Some(c)) if !u.is_empty() && !c.is_empty() => Self {
                urls: vec![url.into()],
                username: Some(u),
                credential: Some(c),
            },
            _ => Self::new(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub sdp_mid: String,
    pub sdp_m_line_index: u16,
    pub candidate: String,
}
