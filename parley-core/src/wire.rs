//! Envelope codec for the HTTP signaling relay.
//!
//! Outbound messages travel as a JSON array of `{"fn", "sessionId", "ev"}`
//! wrappers whose `fn` field holds the JSON-encoded [`SignalingMessage`].
//! Pull and send responses come back inside an OCS envelope.

use crate::model::{IceServerConfig, RosterSnapshot, SessionId, Signal, SignalingMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundEnvelope<'a> {
    #[serde(rename = "fn")]
    function: String,
    session_id: &'a SessionId,
    ev: &'static str,
}

pub fn encode_outbound(own: &SessionId, messages: &[SignalingMessage]) -> Result<String, WireError> {
    let envelopes = messages
        .iter()
        .map(|msg| {
            serde_json::to_string(msg).map(|function| OutboundEnvelope {
                function,
                session_id: own,
                ev: "message",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(serde_json::to_string(&envelopes)?)
}

#[derive(Deserialize)]
struct Ocs<T> {
    ocs: OcsBody<T>,
}

#[derive(Deserialize)]
struct OcsBody<T> {
    data: T,
}

#[derive(Deserialize)]
struct RawSignal {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decodes a pull or send response into signals, preserving delivery order.
///
/// A single undecodable entry becomes [`Signal::Malformed`] instead of
/// failing the whole batch.
pub fn decode_pull_response(body: &str) -> Result<Vec<Signal>, WireError> {
    let envelope: Ocs<Option<Vec<RawSignal>>> = serde_json::from_str(body)?;
    let entries = envelope.ocs.data.unwrap_or_default();
    Ok(entries.into_iter().map(decode_signal).collect())
}

fn decode_signal(raw: RawSignal) -> Signal {
    match raw.kind.as_str() {
        "usersInRoom" => match serde_json::from_value::<RosterSnapshot>(raw.data) {
            Ok(snapshot) => Signal::Roster(snapshot),
            Err(e) => Signal::Malformed(format!("usersInRoom: {e}")),
        },
        "message" => {
            let decoded = match raw.data {
                Value::String(text) => serde_json::from_str::<SignalingMessage>(&text),
                other => serde_json::from_value::<SignalingMessage>(other),
            };
            match decoded {
                Ok(msg) => Signal::Message(msg),
                Err(e) => Signal::Malformed(format!("message: {e}")),
            }
        }
        other => Signal::Unknown(other.to_owned()),
    }
}

#[derive(Deserialize)]
struct StunServer {
    url: String,
}

#[derive(Deserialize)]
struct TurnServer {
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Deserialize)]
struct SignalingSettings {
    #[serde(default)]
    stunservers: Vec<StunServer>,
    #[serde(default)]
    turnservers: Vec<TurnServer>,
}

/// Decodes the signaling-settings response into an ordered ICE server list:
/// STUN servers first, then every URL of every TURN server.
pub fn decode_settings_response(body: &str) -> Result<Vec<IceServerConfig>, WireError> {
    let envelope: Ocs<SignalingSettings> = serde_json::from_str(body)?;
    let settings = envelope.ocs.data;

    let stun = settings
        .stunservers
        .into_iter()
        .map(|s| IceServerConfig::new(s.url));

    let turn = settings.turnservers.into_iter().flat_map(|t| {
        let TurnServer {
            urls,
            username,
            credential,
        } = t;
        urls.into_iter().map(move |url| {
            IceServerConfig::with_credentials(url, username.clone(), credential.clone())
        })
    });

    Ok(stun.chain(turn).collect())
}
