pub mod http_service;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileError;
use crate::types::UserProfile;

/// Mutating operations on the external account service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ProfileOp {
    Activate,
    ConfirmFunding { method: String },
}

impl ProfileOp {
    /// Path segment of the mutating endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ProfileOp::Activate => "activate",
            ProfileOp::ConfirmFunding { .. } => "funding",
        }
    }
}

/// Trait for the external account/verification service.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Idempotent read of the sender's account state.
    async fn fetch(&self, sender_id: &str) -> Result<UserProfile, ProfileError>;

    /// Apply a mutating operation and return the resulting state.
    async fn mutate(&self, sender_id: &str, op: &ProfileOp) -> Result<UserProfile, ProfileError>;
}

struct CacheEntry {
    profile: UserProfile,
    fetched_at: Instant,
}

/// Cached read-through facade over the external account service.
///
/// Reads are bounded-staleness (TTL); any mutating call invalidates the
/// sender's entry so the next read is fresh. Errors are never cached.
pub struct ProfileGateway {
    service: Arc<dyn AccountService>,
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ProfileGateway {
    pub fn new(service: Arc<dyn AccountService>, ttl: Duration) -> Self {
        Self {
            service,
            cache: DashMap::new(),
            ttl,
        }
    }

    pub async fn get_profile(&self, sender_id: &str) -> Result<UserProfile, ProfileError> {
        if let Some(entry) = self.cache.get(sender_id) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!("Profile cache hit for {}", sender_id);
                return Ok(entry.profile.clone());
            }
        }

        let profile = self.service.fetch(sender_id).await?;
        self.cache.insert(
            sender_id.to_string(),
            CacheEntry {
                profile: profile.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(profile)
    }

    pub async fn mutate(
        &self,
        sender_id: &str,
        op: &ProfileOp,
    ) -> Result<UserProfile, ProfileError> {
        let result = self.service.mutate(sender_id, op).await;
        // Invalidate even on failure: the call may have landed.
        self.cache.remove(sender_id);
        result
    }

    /// Drop the cached entry for a sender, e.g. after an out-of-band
    /// status callback changed their account.
    pub fn invalidate(&self, sender_id: &str) {
        self.cache.remove(sender_id);
    }
}
