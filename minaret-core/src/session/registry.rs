//! Session registry: one live session per user

use super::store::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Shared handle to a single user's session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns the mapping from user id to session.
///
/// Sessions are created lazily on first contact and removed on reset.
/// The map is guarded so that concurrent first messages from the same
/// user still produce exactly one session. No expiry: entries live
/// until reset or process exit.
pub struct SessionRegistry {
    persona: String,
    persona_ack: String,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Create a new registry seeding sessions with the given persona exchange
    pub fn new(persona: impl Into<String>, persona_ack: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            persona_ack: persona_ack.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `user_id`, creating a seeded one if none exists.
    ///
    /// Identity-stable: repeated calls for the same user return the
    /// same handle until `reset` removes it.
    pub async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(user_id) {
                return handle.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock: another task may have created
        // the entry between the two lock acquisitions.
        if let Some(handle) = sessions.get(user_id) {
            return handle.clone();
        }

        info!("Starting new chat session for user {}", user_id);
        let session = Session::seeded(user_id, &self.persona, &self.persona_ack);
        let handle: SessionHandle = Arc::new(Mutex::new(session));
        sessions.insert(user_id.to_string(), handle.clone());
        debug!("Session registry size: {}", sessions.len());
        handle
    }

    /// Remove the session for `user_id`. Returns whether one existed.
    pub async fn reset(&self, user_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(user_id).is_some();
        if removed {
            info!("Reset chat session for user {}", user_id);
        }
        removed
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::ChatTurn;

    fn registry() -> SessionRegistry {
        SessionRegistry::new("persona", "ack")
    }

    #[tokio::test]
    async fn test_get_or_create_is_identity_stable() {
        let registry = registry();
        let first = registry.get_or_create("42").await;
        let second = registry.get_or_create("42").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_users_get_distinct_sessions() {
        let registry = registry();
        let a = registry.get_or_create("1").await;
        let b = registry.get_or_create("2").await;

        assert!(!Arc::ptr_eq(&a, &b));

        a.lock().await.add_turn(ChatTurn::user("only for a"));
        assert!(b.lock().await.is_fresh());
        assert_eq!(a.lock().await.turn_count(), 3);
    }

    #[tokio::test]
    async fn test_reset_unknown_user_is_noop() {
        let registry = registry();
        assert!(!registry.reset("never-seen").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_then_create_yields_fresh_session() {
        let registry = registry();
        let before = registry.get_or_create("42").await;
        before.lock().await.add_turn(ChatTurn::user("old question"));

        assert!(registry.reset("42").await);
        let after = registry.get_or_create("42").await;

        assert!(!Arc::ptr_eq(&before, &after));
        let session = after.lock().await;
        assert!(session.is_fresh());
        assert_eq!(session.history()[0].content, "persona");
    }

    #[tokio::test]
    async fn test_concurrent_first_messages_create_one_session() {
        let registry = Arc::new(registry());

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create("42").await })
            })
            .collect();

        let handles = futures::future::join_all(tasks).await;
        let first = handles[0].as_ref().unwrap().clone();
        for handle in handles {
            assert!(Arc::ptr_eq(&first, &handle.unwrap()));
        }
        assert_eq!(registry.len().await, 1);
    }
}
