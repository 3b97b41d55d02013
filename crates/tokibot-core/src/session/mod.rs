pub mod memory;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Dialog position of one sender's conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    #[default]
    Idle,
    AwaitingRegistration,
    AwaitingKyc,
    AwaitingFundingChoice,
    AwaitingCoinChoice,
}

/// Per-sender conversational state. Created lazily on first load and
/// mutated only by the dialog dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub state: DialogState,
    #[serde(default)]
    pub context: HashMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: DialogState::Idle,
            context: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Drop back to an idle conversation with no carried context.
    pub fn reset(&mut self) {
        self.state = DialogState::Idle;
        self.context.clear();
        self.updated_at = Utc::now();
    }

    /// Whether the session has been idle longer than the TTL.
    pub fn is_expired(&self, idle_ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.updated_at);
        age.to_std().map(|a| a >= idle_ttl).unwrap_or(false)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-sender mutexes serializing the load-transition-save section, so
/// two concurrent deliveries for one sender cannot interleave a lost
/// update. Different senders proceed in parallel.
#[derive(Default)]
pub struct SenderLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SenderLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub fn for_sender(&self, sender_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(sender_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_starts_idle() {
        let session = Session::new();
        assert_eq!(session.state, DialogState::Idle);
        assert!(session.context.is_empty());
    }

    #[test]
    fn test_session_reset() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingCoinChoice;
        session.context.insert("coin".into(), "usdt".into());
        session.reset();
        assert_eq!(session.state, DialogState::Idle);
        assert!(session.context.is_empty());
    }

    #[test]
    fn test_session_expiry() {
        let mut session = Session::new();
        assert!(!session.is_expired(Duration::from_secs(60)));
        session.updated_at = Utc::now() - chrono::Duration::seconds(120);
        assert!(session.is_expired(Duration::from_secs(60)));
    }

    #[test]
    fn test_dialog_state_serde() {
        let json = serde_json::to_string(&DialogState::AwaitingCoinChoice).unwrap();
        assert_eq!(json, "\"awaiting_coin_choice\"");
        let state: DialogState = serde_json::from_str("\"idle\"").unwrap();
        assert_eq!(state, DialogState::Idle);
    }

    #[tokio::test]
    async fn test_sender_locks_same_sender_same_mutex() {
        let locks = SenderLocks::new();
        let a = locks.for_sender("user1");
        let b = locks.for_sender("user1");
        assert!(Arc::ptr_eq(&a, &b));

        let c = locks.for_sender("user2");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
