use dashmap::DashMap;
use parley_core::SessionId;
use std::sync::Arc;

/// What the presentation layer may read about one remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSummary {
    pub nick: Option<String>,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub connected: bool,
}

impl Default for PeerSummary {
    fn default() -> Self {
        Self {
            nick: None,
            audio_enabled: true,
            video_enabled: true,
            connected: false,
        }
    }
}

/// Read-only view of the call's participants, safe to clone across threads.
///
/// Only the call loop writes to it; everyone else reads snapshots.
#[derive(Clone, Default)]
pub struct PeerDirectory {
    peers: Arc<DashMap<SessionId, PeerSummary>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &SessionId) -> Option<PeerSummary> {
        self.peers.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.peers.contains_key(session_id)
    }

    pub fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.peers.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub(crate) fn insert(&self, session_id: SessionId) {
        self.peers.entry(session_id).or_default();
    }

    pub(crate) fn update(&self, session_id: &SessionId, f: impl FnOnce(&mut PeerSummary)) {
        if let Some(mut entry) = self.peers.get_mut(session_id) {
            f(entry.value_mut());
        }
    }

    pub(crate) fn remove(&self, session_id: &SessionId) {
        self.peers.remove(session_id);
    }

    pub(crate) fn clear(&self) {
        self.peers.clear();
    }
}
