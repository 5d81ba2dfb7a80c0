use crate::model::ice::IceCandidate;
use crate::model::roster::RosterSnapshot;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const VIDEO_ROOM_TYPE: &str = "video";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
    EndOfCandidates,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::EndOfCandidates => "endOfCandidates",
        }
    }
}

impl FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(Self::Offer),
            "answer" => Ok(Self::Answer),
            "candidate" => Ok(Self::Candidate),
            "endOfCandidates" => Ok(Self::EndOfCandidates),
            other => Err(format!("unknown signaling message type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPayload {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(
        rename = "candidate",
        alias = "iceCandidate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ice_candidate: Option<IceCandidate>,
}

/// Peer-to-peer signaling envelope relayed between two call participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<SessionId>,
    #[serde(default)]
    pub room_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<SignalPayload>,
}

impl SignalingMessage {
    fn outbound(kind: SignalKind, from: &SessionId, to: &SessionId, payload: SignalPayload) -> Self {
        Self {
            message_type: Some(kind.as_str().to_owned()),
            from: Some(from.clone()),
            to: Some(to.clone()),
            room_type: VIDEO_ROOM_TYPE.to_owned(),
            payload: Some(SignalPayload {
                payload_type: Some(kind.as_str().to_owned()),
                ..payload
            }),
        }
    }

    /// Offer or answer carrying an SDP body and the sender's nick.
    pub fn description(
        kind: SignalKind,
        from: &SessionId,
        to: &SessionId,
        sdp: String,
        nick: Option<String>,
    ) -> Self {
        let payload = SignalPayload {
            sdp: Some(sdp),
            nick,
            ..Default::default()
        };
        Self::outbound(kind, from, to, payload)
    }

    pub fn candidate(from: &SessionId, to: &SessionId, candidate: IceCandidate) -> Self {
        let payload = SignalPayload {
            ice_candidate: Some(candidate),
            ..Default::default()
        };
        Self::outbound(SignalKind::Candidate, from, to, payload)
    }

    pub fn end_of_candidates(from: &SessionId, to: &SessionId) -> Self {
        Self::outbound(SignalKind::EndOfCandidates, from, to, SignalPayload::default())
    }

    /// Resolves the effective kind: the payload type wins over the envelope type.
    pub fn kind(&self) -> Result<SignalKind, String> {
        let raw = self
            .payload
            .as_ref()
            .and_then(|p| p.payload_type.as_deref())
            .or(self.message_type.as_deref())
            .ok_or_else(|| "signaling message without a type".to_owned())?;
        raw.parse()
    }

    pub fn is_video_room(&self) -> bool {
        self.room_type == VIDEO_ROOM_TYPE
    }

    pub fn sdp(&self) -> Option<&str> {
        self.payload.as_ref()?.sdp.as_deref()
    }

    pub fn nick(&self) -> Option<&str> {
        self.payload.as_ref()?.nick.as_deref()
    }

    pub fn ice_candidate(&self) -> Option<&IceCandidate> {
        self.payload.as_ref()?.ice_candidate.as_ref()
    }
}

/// One entry of a pull (or send) response from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Roster(RosterSnapshot),
    Message(SignalingMessage),
    /// Entry whose body could not be decoded.
    Malformed(String),
    /// Entry of a type this client does not handle.
    Unknown(String),
}
