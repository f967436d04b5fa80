use async_trait::async_trait;
use scopewise_core::{AppResult, CompanyId};
use scopewise_domain::Site;

/// Local cache port for previously fetched site lists.
///
/// No expiry is applied; callers judge staleness from the cached content.
#[async_trait]
pub trait SiteCache: Send + Sync {
    /// Returns the cached site list for a company.
    async fn get(&self, company_id: &CompanyId) -> AppResult<Option<Vec<Site>>>;

    /// Replaces the cached site list for a company.
    async fn put(&self, company_id: &CompanyId, sites: &[Site]) -> AppResult<()>;

    /// Drops the cached site list for a company.
    async fn invalidate(&self, company_id: &CompanyId) -> AppResult<()>;
}
