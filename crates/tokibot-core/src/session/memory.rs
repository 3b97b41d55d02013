use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;

use super::store::SessionStore;
use super::Session;

/// In-memory session store keyed by sender id.
///
/// Sessions idle past the TTL are replaced with a fresh idle session on
/// the next load, which also purges the stale entry.
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
    idle_ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, sender_id: &str) -> Session {
        if let Some(session) = self.sessions.get(sender_id) {
            if !session.is_expired(self.idle_ttl) {
                return session.clone();
            }
        }
        let fresh = Session::new();
        self.sessions.insert(sender_id.to_string(), fresh.clone());
        fresh
    }

    fn save(&self, sender_id: &str, mut session: Session) {
        session.updated_at = Utc::now();
        self.sessions.insert(sender_id.to_string(), session);
    }

    fn delete(&self, sender_id: &str) -> bool {
        self.sessions.remove(sender_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DialogState;

    #[test]
    fn test_load_creates_idle_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = store.load("234800000");
        assert_eq!(session.state, DialogState::Idle);
        assert!(session.context.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = store.load("u1");
        session.state = DialogState::AwaitingCoinChoice;
        session.context.insert("coin".into(), "btc".into());
        store.save("u1", session);

        let loaded = store.load("u1");
        assert_eq!(loaded.state, DialogState::AwaitingCoinChoice);
        assert_eq!(loaded.context.get("coin").map(String::as_str), Some("btc"));
    }

    #[test]
    fn test_expired_session_resets_to_idle() {
        let store = MemorySessionStore::new(Duration::from_millis(10));
        let mut session = store.load("u1");
        session.state = DialogState::AwaitingFundingChoice;
        store.save("u1", session);

        std::thread::sleep(Duration::from_millis(20));
        let loaded = store.load("u1");
        assert_eq!(loaded.state, DialogState::Idle);
        assert!(loaded.context.is_empty());
    }

    #[test]
    fn test_delete() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.load("u1");
        assert!(store.delete("u1"));
        assert!(!store.delete("u1"));
    }
}
