use super::models::AttemptRecord;
use super::store::AttemptStore;
use crate::error::{audit_error, config_error, QuickCalResult};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client as RedisClient};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Redis keys
mod keys {
    pub const ATTEMPT_PREFIX: &str = "quickcal:attempt:";
}

/// Attempt store backed by Redis; one JSON string per attempt
pub struct RedisAttemptStore {
    client: RedisClient,
    connection: OnceCell<ConnectionManager>,
    ttl_secs: u64,
}

impl RedisAttemptStore {
    /// Create a store for the given Redis URL.
    ///
    /// Nothing is dialed here. The first write opens one managed connection
    /// that every later call shares and that reconnects on its own.
    pub fn new(redis_url: &str, ttl_secs: u64) -> QuickCalResult<Self> {
        info!("Using Redis attempt store at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| config_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            ttl_secs,
        })
    }

    /// Whether the shared connection has been established
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    fn key(attempt_id: &str) -> String {
        format!("{}{}", keys::ATTEMPT_PREFIX, attempt_id)
    }

    /// Clone of the shared connection, established on first use.
    /// A failed attempt is not cached, so the next call dials again.
    async fn get_connection(&self) -> QuickCalResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                debug!("Opening managed Redis connection");
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(2)
                    .set_connection_timeout(Duration::from_secs(2));
                self.client.get_connection_manager_with_config(config).await
            })
            .await
            .map_err(|e| audit_error(&format!("Failed to connect to Redis: {}", e)))?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn put(&self, record: &AttemptRecord) -> QuickCalResult<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| audit_error(&format!("JSON serialization error: {}", e)))?;

        let mut conn = self.get_connection().await?;
        let key = Self::key(&record.attempt_id);

        conn.set_ex::<_, _, ()>(&key, &json, self.ttl_secs)
            .await
            .map_err(|e| audit_error(&format!("Redis SETEX error: {}", e)))?;

        debug!("Stored attempt {} ({})", record.attempt_id, record.outcome.status());
        Ok(())
    }

    async fn get(&self, attempt_id: &str) -> QuickCalResult<Option<AttemptRecord>> {
        let mut conn = self.get_connection().await?;

        let data: Option<String> = conn
            .get(Self::key(attempt_id))
            .await
            .map_err(|e| audit_error(&format!("Redis GET error: {}", e)))?;

        data.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| audit_error(&format!("JSON parse error: {}", e)))
        })
        .transpose()
    }
}
