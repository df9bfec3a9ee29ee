//! # Redis
//!
//! RAM database holding the two pieces of shared state: vote counters and
//! the site settings document.
//!
//! - Vote counters are plain integer keys bumped with atomic `INCR`; an
//!   absent key counts as 0, so counters are created implicitly on first
//!   vote and never read-modify-written from this layer.
//! - The settings document is a single JSON string key, overwritten whole.
//!
//! The rest of the crate talks to storage only through [`KeyValueStore`],
//! so the backend is swappable (the test suite runs against an in-memory
//! implementation).

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands,
};

use crate::error::AppResult;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically increments the integer at `key` by 1, treating an absent
    /// key as 0. Returns the new value.
    async fn increment(&self, key: &str) -> AppResult<i64>;

    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Enumerates every key starting with `prefix`. Order is unspecified.
    async fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Fetches many integer counters in one round trip. Absent or
    /// non-integer values come back as `None`, positionally matched to
    /// `keys`.
    async fn get_many(&self, keys: &[String]) -> AppResult<Vec<Option<i64>>>;
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn increment(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.connection.clone();
        let count: i64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    async fn get_many(&self, keys: &[String]) -> AppResult<Vec<Option<i64>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let counts: Vec<Option<i64>> = conn.mget(keys).await?;
        Ok(counts)
    }
}
