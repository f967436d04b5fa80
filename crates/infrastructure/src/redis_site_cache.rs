//! Redis-backed site cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use scopewise_application::SiteCache;
use scopewise_core::{AppError, AppResult, CompanyId};
use scopewise_domain::Site;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedSites {
    fetched_at: DateTime<Utc>,
    sites: Vec<Site>,
}

/// Redis implementation of the site cache port.
///
/// Entries never expire; a newer site list always replaces the old one.
#[derive(Clone)]
pub struct RedisSiteCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisSiteCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, company_id: &CompanyId) -> String {
        format!("{}:sites:{}", self.key_prefix, company_id)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl SiteCache for RedisSiteCache {
    async fn get(&self, company_id: &CompanyId) -> AppResult<Option<Vec<Site>>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection
            .get(self.key_for(company_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read site cache entry: {error}"))
            })?;

        let Some(encoded) = encoded else {
            return Ok(None);
        };

        let entry: CachedSites = serde_json::from_str(encoded.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid site cache entry for company '{company_id}': {error}"
            ))
        })?;
        Ok(Some(entry.sites))
    }

    async fn put(&self, company_id: &CompanyId, sites: &[Site]) -> AppResult<()> {
        let value = serde_json::to_string(&CachedSites {
            fetched_at: Utc::now(),
            sites: sites.to_vec(),
        })
        .map_err(|error| AppError::Internal(format!("failed to encode site cache entry: {error}")))?;

        let mut connection = self.connection().await?;
        connection
            .set(self.key_for(company_id), value)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write site cache entry: {error}"))
            })
    }

    async fn invalidate(&self, company_id: &CompanyId) -> AppResult<()> {
        let mut connection = self.connection().await?;
        connection
            .del(self.key_for(company_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete site cache entry: {error}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use scopewise_core::CompanyId;

    use super::RedisSiteCache;

    #[test]
    fn keys_are_namespaced_per_company() {
        let client = redis::Client::open("redis://127.0.0.1:6379");
        assert!(client.is_ok());
        let Ok(client) = client else {
            return;
        };
        let cache = RedisSiteCache::new(client, "scopewise");
        let company_id = CompanyId::new("acme").unwrap_or_else(|_| unreachable!());

        assert_eq!(cache.key_for(&company_id), "scopewise:sites:acme");
    }
}
