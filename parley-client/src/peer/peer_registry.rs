use crate::error::CallError;
use crate::peer::peer_session::PeerSession;
use crate::transport::{ConnectionParams, LocalMedia, MediaConnectionFactory, PeerEvent};
use parley_core::{IceServerConfig, SessionId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Owns every live [`PeerSession`] of a call, keyed by remote session id.
///
/// The registry is held by the call loop alone, so create-if-absent is a
/// single `&mut self` step and at most one media connection exists per id.
pub struct PeerSessionRegistry {
    sessions: HashMap<SessionId, PeerSession>,
    factory: Arc<dyn MediaConnectionFactory>,
    events: mpsc::Sender<PeerEvent>,
    local_id: SessionId,
    ice_servers: Arc<Vec<IceServerConfig>>,
    local_media: Option<LocalMedia>,
}

impl PeerSessionRegistry {
    pub fn new(factory: Arc<dyn MediaConnectionFactory>, events: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            sessions: HashMap::new(),
            factory,
            events,
            local_id: SessionId::unassigned(),
            ice_servers: Arc::new(Vec::new()),
            local_media: None,
        }
    }

    /// Binds sessions created from now on to a new call attempt.
    pub fn bind(
        &mut self,
        local_id: SessionId,
        ice_servers: Vec<IceServerConfig>,
        local_media: Option<LocalMedia>,
    ) {
        self.local_id = local_id;
        self.ice_servers = Arc::new(ice_servers);
        self.local_media = local_media;
    }

    pub fn local_id(&self) -> &SessionId {
        &self.local_id
    }

    pub async fn get_or_create(&mut self, session_id: &SessionId) -> Result<&mut PeerSession, CallError> {
        match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                // The side whose id sorts later makes the offer.
                let initiator = *session_id < self.local_id;
                let params = ConnectionParams {
                    session_id: session_id.clone(),
                    ice_servers: self.ice_servers.clone(),
                    local_media: self.local_media.clone(),
                    initiator,
                };

                let connection = self
                    .factory
                    .connect(params, self.events.clone())
                    .await
                    .map_err(|e| CallError::protocol(session_id, e))?;

                info!("Created peer session {} (initiator: {})", session_id, initiator);
                Ok(entry.insert(PeerSession::new(
                    session_id.clone(),
                    self.local_id.clone(),
                    connection,
                    initiator,
                )))
            }
        }
    }

    pub fn lookup(&self, session_id: &SessionId) -> Option<&PeerSession> {
        self.sessions.get(session_id)
    }

    pub fn lookup_mut(&mut self, session_id: &SessionId) -> Option<&mut PeerSession> {
        self.sessions.get_mut(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Closes and drops the session. Returns `false` when the id was unknown.
    pub async fn remove(&mut self, session_id: &SessionId) -> bool {
        let Some(mut session) = self.sessions.remove(session_id) else {
            return false;
        };
        session.close().await;
        debug!("Removed peer session {}", session_id);
        true
    }

    /// Tears down every session, returning the ids that were closed.
    pub async fn remove_all(&mut self) -> Vec<SessionId> {
        let mut closed = Vec::with_capacity(self.sessions.len());
        for (session_id, mut session) in self.sessions.drain() {
            session.close().await;
            closed.push(session_id);
        }
        closed.sort();
        closed
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn sessions(&self) -> impl Iterator<Item = &PeerSession> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
