use parley_core::SessionId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How far into the relay this device may have got. Requests cut off
/// mid-flight count as having reached the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelayPresence {
    #[default]
    None,
    Room,
    Call,
}

/// This device's participation in the room.
pub struct CallSession {
    pub token: String,
    pub session_id: SessionId,
    pub relay: RelayPresence,
    leaving: Arc<AtomicBool>,
}

impl CallSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            session_id: SessionId::unassigned(),
            relay: RelayPresence::None,
            leaving: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_leaving(&self) -> bool {
        self.leaving.load(Ordering::SeqCst)
    }

    pub fn set_leaving(&self, leaving: bool) {
        self.leaving.store(leaving, Ordering::SeqCst);
    }

    /// The flag the pumps consult before every request.
    pub fn leaving_flag(&self) -> Arc<AtomicBool> {
        self.leaving.clone()
    }

    /// Records that the join pipeline got at least as far as `presence`.
    pub fn reached(&mut self, presence: RelayPresence) {
        self.relay = self.relay.max(presence);
    }
}
