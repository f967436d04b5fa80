use async_trait::async_trait;
use scopewise_core::AppResult;

/// String key-value port holding the persisted selection between runs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads one value.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Writes one value.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Removes one value.
    async fn remove(&self, key: &str) -> AppResult<()>;
}
