//! Session types

use crate::{PlayerIdentity, Timestamp};
use serde::{Deserialize, Serialize};

/// Process-local session counter. Unique within one engine instance.
pub type SessionId = u64;

/// Ties a player to the local process for the duration of a login.
///
/// Exactly one handle exists per (player, process) pair at a time; a relogin
/// replaces the previous handle. Created by the engine on the host's login
/// event and destroyed on logout or disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub player: PlayerIdentity,
    pub started_at: Timestamp,
}

impl SessionHandle {
    /// Milliseconds elapsed since the session started.
    pub fn session_time_ms(&self, now: Timestamp) -> i64 {
        (now - self.started_at).num_milliseconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn session_time_is_elapsed_millis() {
        let started = Utc::now();
        let handle = SessionHandle {
            session_id: 1,
            player: PlayerIdentity::new(Uuid::new_v4(), "Steve"),
            started_at: started,
        };
        let later = started + Duration::milliseconds(1500);
        assert_eq!(handle.session_time_ms(later), 1500);
        // clock going backwards never yields a negative session time
        assert_eq!(handle.session_time_ms(started - Duration::seconds(5)), 0);
    }
}
