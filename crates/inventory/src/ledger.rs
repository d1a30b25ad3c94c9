//! Idempotency ledger for attempt tokens.
//!
//! A token is marked processed when its `confirm` first succeeds and removed
//! when it is released. The store is injected into the engine so a shared
//! backing store can replace the in-memory one without touching the engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AttemptToken, Clock};
use tokio::sync::RwLock;

/// Default retention for processed markers.
pub const DEFAULT_LEDGER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    /// Whether `token` has a live processed marker.
    async fn is_processed(&self, token: &AttemptToken) -> bool;

    /// Records `token` as processed.
    async fn mark_processed(&self, token: &AttemptToken);

    /// Drops the marker for `token`. Returns whether a live marker existed.
    async fn remove(&self, token: &AttemptToken) -> bool;
}

/// In-memory ledger whose markers expire after a fixed TTL.
///
/// Expired markers read as absent and are swept on every write.
#[derive(Debug, Clone)]
pub struct InMemoryIdempotencyLedger {
    entries: Arc<RwLock<HashMap<AttemptToken, DateTime<Utc>>>>,
    ttl: chrono::TimeDelta,
    clock: Arc<dyn Clock>,
}

impl InMemoryIdempotencyLedger {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX),
            clock,
        }
    }

    /// Number of stored markers, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Removes every expired marker. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, recorded| !self.expired(*recorded, now));
        before - entries.len()
    }

    fn expired(&self, recorded: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(recorded) >= self.ttl
    }
}

#[async_trait]
impl IdempotencyLedger for InMemoryIdempotencyLedger {
    async fn is_processed(&self, token: &AttemptToken) -> bool {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(token)
            .is_some_and(|recorded| !self.expired(*recorded, now))
    }

    async fn mark_processed(&self, token: &AttemptToken) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, recorded| !self.expired(*recorded, now));
        entries.insert(token.clone(), now);
    }

    async fn remove(&self, token: &AttemptToken) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries
            .remove(token)
            .is_some_and(|recorded| !self.expired(recorded, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::ManualClock;

    fn ledger(ttl_secs: u64) -> (InMemoryIdempotencyLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        ));
        let ledger = InMemoryIdempotencyLedger::new(Duration::from_secs(ttl_secs), clock.clone());
        (ledger, clock)
    }

    #[tokio::test]
    async fn test_mark_then_remove() {
        let (ledger, _) = ledger(60);
        let token = AttemptToken::new("t-1");

        assert!(!ledger.is_processed(&token).await);
        ledger.mark_processed(&token).await;
        assert!(ledger.is_processed(&token).await);

        assert!(ledger.remove(&token).await);
        assert!(!ledger.is_processed(&token).await);
        assert!(!ledger.remove(&token).await);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_markers_expire_after_ttl() {
        let (ledger, clock) = ledger(60);
        let token = AttemptToken::new("t-1");
        ledger.mark_processed(&token).await;

        clock.advance(Duration::from_secs(59));
        assert!(ledger.is_processed(&token).await);

        clock.advance(Duration::from_secs(1));
        assert!(!ledger.is_processed(&token).await);
        assert_eq!(ledger.purge_expired().await, 1);
        assert_eq!(ledger.len().await, 0);
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_markers() {
        let (ledger, clock) = ledger(60);
        ledger.mark_processed(&AttemptToken::new("old")).await;
        clock.advance(Duration::from_secs(120));

        ledger.mark_processed(&AttemptToken::new("new")).await;

        assert_eq!(ledger.len().await, 1);
        assert!(ledger.is_processed(&AttemptToken::new("new")).await);
    }
}
