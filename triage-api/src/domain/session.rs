//! Process-wide session store for multi-turn routing state.
//!
//! Sessions are keyed by an opaque identifier and live in a moka cache with
//! idle-based expiry, so an abandoned conversation ages out on its own.
//! Loss of session state only degrades routing back to first-turn behavior;
//! it is never a correctness problem.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::sync::Mutex;

use crate::config::SessionSettings;
use crate::domain::routing::RoutingDecision;

/// Context recorded at the end of a turn, available to the next turn on the
/// same session.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub decision: RoutingDecision,
    pub surfaced_similar: bool,
}

/// Minimal per-session state.
#[derive(Debug, Default)]
pub struct Session {
    pub turn_count: u64,
    pub last_context: Option<TurnContext>,
}

impl Session {
    pub fn is_first_turn(&self) -> bool {
        self.turn_count == 0
    }

    /// Close out the current turn: bump the counter and remember what
    /// happened for the next one.
    pub fn record_turn(&mut self, context: TurnContext) {
        self.turn_count += 1;
        self.last_context = Some(context);
    }
}

/// Concurrent map from session id to session state.
///
/// Entries for different ids never contend. Each entry carries its own
/// async mutex; holding it for the duration of a turn serializes turns
/// within one session.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new(settings: &SessionSettings) -> Self {
        let sessions = Cache::builder()
            .max_capacity(settings.max_sessions)
            .time_to_idle(Duration::from_secs(settings.idle_timeout_secs))
            .build();

        Self { sessions }
    }

    /// Fetch the session for `session_id`, creating it with a zero turn
    /// count if this is the first time the id is seen.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        self.sessions
            .get_with(session_id.to_string(), || {
                Arc::new(Mutex::new(Session::default()))
            })
    }

    #[cfg(test)]
    pub fn len(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(&SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_session_starts_at_turn_zero() {
        let store = SessionStore::default();
        let session = store.get_or_create("s1");
        let session = session.lock().await;

        assert!(session.is_first_turn());
        assert!(session.last_context.is_none());
    }

    #[tokio::test]
    async fn record_turn_increments_and_stores_context() {
        let store = SessionStore::default();
        let handle = store.get_or_create("s1");
        {
            let mut session = handle.lock().await;
            session.record_turn(TurnContext {
                decision: RoutingDecision::Search,
                surfaced_similar: true,
            });
        }

        // Same id resolves to the same entry.
        let handle = store.get_or_create("s1");
        let session = handle.lock().await;
        assert_eq!(session.turn_count, 1);
        assert!(!session.is_first_turn());
        assert!(session.last_context.as_ref().unwrap().surfaced_similar);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::default();
        {
            let handle = store.get_or_create("s1");
            let mut session = handle.lock().await;
            session.record_turn(TurnContext {
                decision: RoutingDecision::Create,
                surfaced_similar: false,
            });
        }

        let other = store.get_or_create("s2");
        let other = other.lock().await;
        assert!(other.is_first_turn());
        assert_eq!(store.len(), 2);
    }
}
