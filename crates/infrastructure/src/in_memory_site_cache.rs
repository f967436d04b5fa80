use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scopewise_application::SiteCache;
use scopewise_core::{AppResult, CompanyId};
use scopewise_domain::Site;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CachedSites {
    sites: Vec<Site>,
    fetched_at: DateTime<Utc>,
}

/// In-memory site cache for a single process.
#[derive(Default)]
pub struct InMemorySiteCache {
    entries: RwLock<HashMap<CompanyId, CachedSites>>,
}

impl InMemorySiteCache {
    /// Creates an empty in-memory site cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns when the company's entry was last written.
    pub async fn fetched_at(&self, company_id: &CompanyId) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .get(company_id)
            .map(|entry| entry.fetched_at)
    }
}

#[async_trait]
impl SiteCache for InMemorySiteCache {
    async fn get(&self, company_id: &CompanyId) -> AppResult<Option<Vec<Site>>> {
        Ok(self
            .entries
            .read()
            .await
            .get(company_id)
            .map(|entry| entry.sites.clone()))
    }

    async fn put(&self, company_id: &CompanyId, sites: &[Site]) -> AppResult<()> {
        self.entries.write().await.insert(
            company_id.clone(),
            CachedSites {
                sites: sites.to_vec(),
                fetched_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn invalidate(&self, company_id: &CompanyId) -> AppResult<()> {
        self.entries.write().await.remove(company_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scopewise_application::SiteCache;
    use scopewise_core::CompanyId;
    use scopewise_domain::Site;

    use super::InMemorySiteCache;

    #[tokio::test]
    async fn put_replaces_whole_list() {
        let cache = InMemorySiteCache::new();
        let company_id = CompanyId::new("acme").unwrap_or_else(|_| unreachable!());

        assert!(cache.put(&company_id, &[Site::new("s1", "Main")]).await.is_ok());
        assert!(
            cache
                .put(&company_id, &[Site::new("s2", "Annex"), Site::new("s3", "Depot")])
                .await
                .is_ok()
        );

        let cached = cache.get(&company_id).await.ok().flatten().unwrap_or_default();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].site_id, "s2");
        assert!(cache.fetched_at(&company_id).await.is_some());

        assert!(cache.invalidate(&company_id).await.is_ok());
        assert!(matches!(cache.get(&company_id).await, Ok(None)));
        assert!(cache.fetched_at(&company_id).await.is_none());
    }
}
