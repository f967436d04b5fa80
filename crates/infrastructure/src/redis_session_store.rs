//! Redis-backed session store.

use async_trait::async_trait;
use redis::AsyncCommands;
use scopewise_application::SessionStore;
use scopewise_core::{AppError, AppResult};

/// Redis implementation of the session store port.
///
/// Every session is one hash keyed by its session id.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    hash_key: String,
}

impl RedisSessionStore {
    /// Creates a session store for one session id.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: &str, session_id: &str) -> Self {
        Self {
            client,
            hash_key: format!("{key_prefix}:session:{session_id}"),
        }
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut connection = self.connection().await?;
        connection
            .hget(self.hash_key.as_str(), key)
            .await
            .map_err(|error| AppError::Internal(format!("failed to read session key '{key}': {error}")))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        connection
            .hset(self.hash_key.as_str(), key, value)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write session key '{key}': {error}"))
            })
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        connection
            .hdel(self.hash_key.as_str(), key)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to remove session key '{key}': {error}"))
            })
    }
}
