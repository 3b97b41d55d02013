use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Claims are swept this often to keep retention bounded.
const SWEEP_EVERY: u64 = 256;

/// Records provider message ids that were already claimed for processing,
/// so redelivered events short-circuit to a no-op ack.
///
/// Retention is time-bounded: ids older than the window are forgotten,
/// which bounds memory at the cost of treating a very late redelivery as
/// new. The window must exceed the provider's retry horizon.
pub struct IdempotencyGuard {
    seen: DashMap<String, Instant>,
    retention: Duration,
    claims: AtomicU64,
}

impl IdempotencyGuard {
    pub fn new(retention: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            retention,
            claims: AtomicU64::new(0),
        }
    }

    /// Atomically claim a provider message id.
    ///
    /// Returns true exactly once per id within the retention window;
    /// concurrent claims for the same id resolve so only one caller wins.
    pub fn claim(&self, provider_message_id: &str) -> bool {
        let n = self.claims.fetch_add(1, Ordering::Relaxed);
        if n % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep();
        }

        match self.seen.entry(provider_message_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().elapsed() >= self.retention {
                    entry.insert(Instant::now());
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Instant::now());
                true
            }
        }
    }

    /// Drop ids older than the retention window.
    pub fn sweep(&self) {
        let retention = self.retention;
        self.seen.retain(|_, claimed_at| claimed_at.elapsed() < retention);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
