use parley_core::{RosterSnapshot, SessionId};
use std::collections::BTreeSet;

/// Session ids to create and to tear down after one roster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDelta {
    pub joined: Vec<SessionId>,
    pub left: Vec<SessionId>,
}

impl RosterDelta {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Diffs roster snapshots against the live peer sessions.
pub struct RoomPresenceReconciler;

impl RoomPresenceReconciler {
    /// Computes which sessions to create and which to drop.
    ///
    /// Every live session not marked in-call is presumed gone. An id listed
    /// both in and out of the call in the same snapshot counts as present.
    /// Ids whose presence did not change produce nothing, so feeding the same
    /// snapshot twice yields an empty delta the second time.
    pub fn reconcile<'a>(
        snapshot: &RosterSnapshot,
        self_id: &SessionId,
        current: impl IntoIterator<Item = &'a SessionId>,
    ) -> RosterDelta {
        let current: BTreeSet<&SessionId> = current.into_iter().collect();
        let mut present = BTreeSet::new();
        let mut absent: BTreeSet<&SessionId> = current.iter().copied().collect();

        for entry in snapshot.iter().filter(|e| &e.session_id != self_id) {
            if entry.in_call {
                present.insert(&entry.session_id);
            } else {
                absent.insert(&entry.session_id);
            }
        }
        absent.remove(self_id);

        let joined = present
            .iter()
            .filter(|id| !current.contains(*id))
            .map(|id| (*id).clone())
            .collect();
        let left = absent
            .difference(&present)
            .filter(|id| current.contains(*id))
            .map(|id| (*id).clone())
            .collect();

        RosterDelta { joined, left }
    }
}
