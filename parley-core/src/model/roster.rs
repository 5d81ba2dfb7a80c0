use crate::model::session::SessionId;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub session_id: SessionId,
    #[serde(deserialize_with = "deserialize_in_call")]
    pub in_call: bool,
}

impl RosterEntry {
    pub fn new(session_id: impl Into<SessionId>, in_call: bool) -> Self {
        Self {
            session_id: session_id.into(),
            in_call,
        }
    }
}

/// Room occupancy at one point in time. Each snapshot supersedes the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterSnapshot {
    pub entries: Vec<RosterEntry>,
}

impl RosterSnapshot {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }
}

impl FromIterator<RosterEntry> for RosterSnapshot {
    fn from_iter<I: IntoIterator<Item = RosterEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InCallFlag {
    Bool(bool),
    Number(i64),
}

// Older relays report the flag as a bitmask integer.
fn deserialize_in_call<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match InCallFlag::deserialize(deserializer)? {
        InCallFlag::Bool(b) => b,
        InCallFlag::Number(n) => n != 0,
    })
}
