//! Redis-based cache for ranked match lists
//!
//! One entry per user, keyed `matches:{user_id}`, holding the serialized
//! ranked (candidate id, score, insights) tuples and a generation timestamp.
//! Profile content is never cached here; it is re-fetched live on every hit
//! so matching freshness and profile freshness stay decoupled.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{CachedMatchList, RankedMatch};

/// Key/value store for ranked match lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchCacheStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<CachedMatchList>>;
    async fn set(&self, user_id: Uuid, entries: Vec<RankedMatch>) -> Result<()>;
    async fn delete(&self, user_id: Uuid) -> Result<()>;
}

/// Match cache layer using Redis
#[derive(Clone)]
pub struct MatchCache {
    client: Arc<ConnectionManager>,
    ttl_secs: u64,
}

impl MatchCache {
    /// Create a new match cache instance
    pub async fn new(redis_url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create Redis connection: {}", e)))?;

        Ok(Self {
            client: Arc::new(manager),
            ttl_secs,
        })
    }

    fn key(user_id: Uuid) -> String {
        format!("matches:{}", user_id)
    }

    /// Ping Redis to check connection health
    pub async fn ping(&self) -> Result<()> {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.client.as_ref().clone())
            .await
            .map_err(|e| {
                warn!("Redis PING failed: {}", e);
                AppError::Internal(format!("Redis health check failed: {}", e))
            })?;
        Ok(())
    }
}

#[async_trait]
impl MatchCacheStore for MatchCache {
    /// Get the cached ranked list for a user.
    ///
    /// A corrupt or incompatible payload is logged and reported as a miss;
    /// it must never fail the request.
    async fn get(&self, user_id: Uuid) -> Result<Option<CachedMatchList>> {
        let key = Self::key(user_id);

        let value: Option<String> = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut self.client.as_ref().clone())
            .await
            .map_err(|e| {
                warn!("Redis GET failed for {}: {}", key, e);
                AppError::Redis(e)
            })?;

        match value {
            Some(json) => match serde_json::from_str::<CachedMatchList>(&json) {
                Ok(cached) => {
                    debug!(user_id = %user_id, entries = cached.entries.len(), "Match cache hit");
                    Ok(Some(cached))
                }
                Err(e) => {
                    warn!(user_id = %user_id, "Discarding corrupt match cache payload: {}", e);
                    Ok(None)
                }
            },
            None => {
                debug!(user_id = %user_id, "Match cache miss");
                Ok(None)
            }
        }
    }

    /// Cache the ranked list, stamped with the current time.
    async fn set(&self, user_id: Uuid, entries: Vec<RankedMatch>) -> Result<()> {
        let key = Self::key(user_id);
        let payload = CachedMatchList {
            entries,
            generated_at: Utc::now(),
        };
        let json = serde_json::to_string(&payload)?;

        redis::cmd("SETEX")
            .arg(&key)
            .arg(self.ttl_secs)
            .arg(&json)
            .query_async::<_, ()>(&mut self.client.as_ref().clone())
            .await
            .map_err(|e| {
                warn!("Redis SETEX failed for {}: {}", key, e);
                AppError::Redis(e)
            })?;

        debug!(user_id = %user_id, ttl = self.ttl_secs, "Cached match list");
        Ok(())
    }

    /// Drop a user's entry regardless of remaining TTL.
    async fn delete(&self, user_id: Uuid) -> Result<()> {
        let key = Self::key(user_id);

        redis::cmd("DEL")
            .arg(&key)
            .query_async::<_, ()>(&mut self.client.as_ref().clone())
            .await
            .map_err(|e| {
                warn!("Redis DEL failed for {}: {}", key, e);
                AppError::Redis(e)
            })?;

        debug!(user_id = %user_id, "Invalidated match cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InsightKind, MatchInsight, MatchScore};

    #[test]
    fn cache_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            MatchCache::key(id),
            "matches:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn corrupt_payload_parses_as_none() {
        // The read path treats an unparseable payload as a miss; verify the
        // parse itself rejects garbage rather than producing a bogus entry.
        assert!(serde_json::from_str::<CachedMatchList>("{\"nope\":1}").is_err());
        assert!(serde_json::from_str::<CachedMatchList>("not json").is_err());
    }

    #[test]
    fn cached_payload_round_trips() {
        let payload = CachedMatchList {
            entries: vec![RankedMatch {
                candidate_id: Uuid::new_v4(),
                total: 64.0,
                breakdown: Some(MatchScore {
                    age: 25.0,
                    location: 8.0,
                    interest: 13.0,
                    personality: 10.0,
                    behavior: 8.0,
                }),
                insights: vec![MatchInsight::new(InsightKind::AgeExact, "Same age", 0.5)],
            }],
            generated_at: Utc::now(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        let parsed: CachedMatchList = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].breakdown.unwrap().age, 25.0);
    }
}
