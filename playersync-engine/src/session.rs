//! Session registry.
//!
//! Tracks which players are active on this process. The engine consults it
//! to decide which cache entries stay pinned. Login/logout transitions run
//! under the engine's per-player lock, so a load never interleaves with the
//! end of the session it belongs to.

use chrono::Utc;
use playersync_core::{PlayerId, PlayerIdentity, SessionHandle};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    sessions: HashMap<PlayerId, SessionHandle>,
    next_session_id: u64,
}

#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `identity`, replacing any existing one so
    /// exactly one handle exists per (player, process) pair.
    pub fn login(&self, identity: PlayerIdentity) -> SessionHandle {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.next_session_id += 1;
        let handle = SessionHandle {
            session_id: inner.next_session_id,
            player: identity.clone(),
            started_at: Utc::now(),
        };
        inner.sessions.insert(identity.id, handle.clone());
        handle
    }

    /// Destroy `handle`'s session. Returns false when the handle is stale
    /// (already logged out, or replaced by a newer login).
    pub fn logout(&self, handle: &SessionHandle) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        match inner.sessions.get(&handle.player.id) {
            Some(current) if current.session_id == handle.session_id => {
                inner.sessions.remove(&handle.player.id);
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, id: &PlayerId) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .sessions
            .contains_key(id)
    }

    pub fn active_players(&self) -> Vec<PlayerIdentity> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .sessions
            .values()
            .map(|handle| handle.player.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .sessions
            .len()
    }
}
