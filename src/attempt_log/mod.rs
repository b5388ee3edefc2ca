mod models;
mod redis_store;
mod store;

pub use models::{
    AttemptOutcome, AttemptRecord, ANONYMOUS_USER, UNKNOWN_ATTEMPT_ID, UNKNOWN_SESSION,
};
pub use redis_store::RedisAttemptStore;
pub use store::{AttemptStore, InMemoryAttemptStore};

use crate::config::Config;
use crate::error::QuickCalResult;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Best-effort sink for attempt records.
///
/// Writes are upserts keyed by attempt id, so a later write for the same
/// attempt replaces the earlier one. Write failures are logged and dropped.
#[derive(Clone)]
pub struct AttemptLog {
    store: Arc<dyn AttemptStore>,
    write_timeout: Duration,
}

impl fmt::Debug for AttemptLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptLog")
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

impl AttemptLog {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self {
            store,
            write_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Pick the store from configuration: Redis when configured, memory otherwise
    pub fn from_config(config: &Config) -> Self {
        let in_memory = || -> Arc<dyn AttemptStore> {
            Arc::new(InMemoryAttemptStore::with_limits(
                Duration::from_secs(config.attempt_ttl_secs),
                config.memory_attempt_capacity,
            ))
        };
        let store: Arc<dyn AttemptStore> = match &config.redis_url {
            Some(url) => match RedisAttemptStore::new(url, config.attempt_ttl_secs) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to set up Redis attempt store: {}", e);
                    info!("Using in-memory attempt store as fallback");
                    in_memory()
                }
            },
            None => {
                info!("REDIS_URL not set, using in-memory attempt store");
                in_memory()
            }
        };

        Self::new(store).with_write_timeout(config.audit_write_timeout)
    }

    /// Write the record. Never fails and never blocks longer than the write timeout.
    pub async fn record(&self, attempt: &AttemptRecord) {
        match tokio::time::timeout(self.write_timeout, self.store.put(attempt)).await {
            Ok(Ok(())) => debug!(
                attempt_id = %attempt.attempt_id,
                status = attempt.outcome.status(),
                "Attempt recorded"
            ),
            Ok(Err(e)) => error!(
                attempt_id = %attempt.attempt_id,
                status = attempt.outcome.status(),
                "Attempt log write failed: {}",
                e
            ),
            Err(_) => error!(
                attempt_id = %attempt.attempt_id,
                status = attempt.outcome.status(),
                "Attempt log write timed out after {:?}",
                self.write_timeout
            ),
        }
    }

    /// Read a record back
    pub async fn get(&self, attempt_id: &str) -> QuickCalResult<Option<AttemptRecord>> {
        self.store.get(attempt_id).await
    }
}
