use super::models::AttemptRecord;
use crate::config::{DEFAULT_ATTEMPT_TTL_SECS, DEFAULT_MEMORY_ATTEMPT_CAPACITY};
use crate::error::QuickCalResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Durable storage for attempt records, keyed by attempt id
#[async_trait]
pub trait AttemptStore: Send + Sync + 'static {
    /// Insert or fully replace the record with the same attempt id
    async fn put(&self, record: &AttemptRecord) -> QuickCalResult<()>;

    /// Fetch a record by attempt id
    async fn get(&self, attempt_id: &str) -> QuickCalResult<Option<AttemptRecord>>;
}

#[derive(Debug)]
struct StoredAttempt {
    record: AttemptRecord,
    written_at: Instant,
}

/// In-memory implementation, used when no Redis is configured and in tests.
///
/// Records expire `ttl` after their last write. When full, a write for a new
/// attempt first drops expired records and then the least recently written one.
#[derive(Debug)]
pub struct InMemoryAttemptStore {
    records: RwLock<HashMap<String, StoredAttempt>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for InMemoryAttemptStore {
    fn default() -> Self {
        Self::with_limits(
            Duration::from_secs(DEFAULT_ATTEMPT_TTL_SECS),
            DEFAULT_MEMORY_ATTEMPT_CAPACITY,
        )
    }
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one
    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Number of stored records, expired ones included until the next write
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn is_expired(&self, stored: &StoredAttempt, now: Instant) -> bool {
        now.saturating_duration_since(stored.written_at) >= self.ttl
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn put(&self, record: &AttemptRecord) -> QuickCalResult<()> {
        let now = Instant::now();
        let mut records = self.records.write().await;

        if !records.contains_key(&record.attempt_id) && records.len() >= self.capacity {
            records.retain(|_, stored| !self.is_expired(stored, now));

            while records.len() >= self.capacity {
                let oldest = records
                    .iter()
                    .min_by_key(|(_, stored)| stored.written_at)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        debug!(attempt_id = %id, "Evicting oldest in-memory attempt");
                        records.remove(&id);
                    }
                    None => break,
                }
            }
        }

        records.insert(
            record.attempt_id.clone(),
            StoredAttempt {
                record: record.clone(),
                written_at: now,
            },
        );
        Ok(())
    }

    async fn get(&self, attempt_id: &str) -> QuickCalResult<Option<AttemptRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(attempt_id)
            .filter(|stored| !self.is_expired(stored, Instant::now()))
            .map(|stored| stored.record.clone()))
    }
}
