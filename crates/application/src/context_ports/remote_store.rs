use async_trait::async_trait;
use scopewise_core::{AppResult, CompanyId};
use scopewise_domain::{DataManagementConfig, Site, Tenant};
use serde::{Deserialize, Serialize};

/// Input payload for creating or updating a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSiteInput {
    /// Display name.
    pub name: String,
    /// Postal address.
    pub address: Option<String>,
}

/// Input payload for creating or updating a subsite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSubsiteInput {
    /// Display name.
    pub name: String,
    /// Free-form location label.
    pub location: Option<String>,
    /// Postal address.
    pub address: Option<String>,
}

/// Port for the eventually consistent store that owns tenant data.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the full current site list, subsites and teams embedded.
    async fn fetch_sites(&self, company_id: &CompanyId) -> AppResult<Vec<Site>>;

    /// Returns the tenant root document.
    async fn fetch_tenant(&self, company_id: &CompanyId) -> AppResult<Option<Tenant>>;

    /// Returns the storage-scope override stored for one subsite.
    async fn fetch_subsite_config(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
    ) -> AppResult<Option<DataManagementConfig>>;

    /// Creates a site and returns its id.
    async fn create_site(&self, company_id: &CompanyId, input: SaveSiteInput)
    -> AppResult<String>;

    /// Updates a site.
    async fn update_site(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        input: SaveSiteInput,
    ) -> AppResult<()>;

    /// Deletes a site together with its embedded subsites.
    async fn delete_site(&self, company_id: &CompanyId, site_id: &str) -> AppResult<()>;

    /// Creates a subsite under a site and returns its id.
    async fn create_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        input: SaveSubsiteInput,
    ) -> AppResult<String>;

    /// Updates a subsite.
    async fn update_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
        input: SaveSubsiteInput,
    ) -> AppResult<()>;

    /// Deletes a subsite.
    async fn delete_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
    ) -> AppResult<()>;
}
