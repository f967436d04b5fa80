//! HTTP adapter for the remote tenant store.

use std::time::Duration;

use async_trait::async_trait;
use scopewise_application::{
    PermissionTableRepository, RemoteStore, SaveSiteInput, SaveSubsiteInput,
};
use scopewise_core::{AppError, AppResult, CompanyId};
use scopewise_domain::{DataManagementConfig, PermissionTable, Site, Tenant};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    id: String,
}

/// Remote store reached over a JSON HTTP API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    http_client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpRemoteStore {
    /// Creates a remote store client.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            bearer_token,
        }
    }

    /// Builds the HTTP client used by the store.
    pub fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))
    }

    /// Builds `<base>/companies/<company>/<segments..>`, percent-encoding each segment.
    fn company_url(&self, company_id: &CompanyId, segments: &[&str]) -> AppResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|error| {
            AppError::InvalidInput(format!("invalid remote url '{}': {error}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                AppError::InvalidInput(format!("remote url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push("companies")
            .push(company_id.as_str())
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        let builder = self.http_client.request(method, url);
        match self.bearer_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and decodes the JSON body; `404` becomes `None`.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> AppResult<Option<T>> {
        let response = builder
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("failed to fetch {what}: {error}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(what, "remote document not found");
            return Ok(None);
        }
        let response = ensure_success(response, what).await?;

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|error| AppError::Internal(format!("failed to decode {what}: {error}")))
    }

    async fn send_mutation(&self, builder: reqwest::RequestBuilder, what: &str) -> AppResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("failed to {what}: {error}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("failed to {what}: document not found")));
        }

        ensure_success(response, what).await
    }
}

async fn ensure_success(response: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
    Err(AppError::Internal(format!(
        "{what} failed with status {status}: {body}"
    )))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_sites(&self, company_id: &CompanyId) -> AppResult<Vec<Site>> {
        let url = self.company_url(company_id, &["sites"])?;
        Ok(self
            .fetch_optional::<Vec<Site>>(self.request(reqwest::Method::GET, url), "sites")
            .await?
            .unwrap_or_default())
    }

    async fn fetch_tenant(&self, company_id: &CompanyId) -> AppResult<Option<Tenant>> {
        let url = self.company_url(company_id, &[])?;
        self.fetch_optional(self.request(reqwest::Method::GET, url), "tenant")
            .await
    }

    async fn fetch_subsite_config(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
    ) -> AppResult<Option<DataManagementConfig>> {
        let url = self.company_url(
            company_id,
            &["sites", site_id, "subsites", subsite_id, "data-management"],
        )?;
        self.fetch_optional(self.request(reqwest::Method::GET, url), "subsite config")
            .await
    }

    async fn create_site(&self, company_id: &CompanyId, input: SaveSiteInput) -> AppResult<String> {
        let url = self.company_url(company_id, &["sites"])?;
        let response = self
            .send_mutation(
                self.request(reqwest::Method::POST, url).json(&input),
                "create site",
            )
            .await?;

        response
            .json::<CreatedDocument>()
            .await
            .map(|created| created.id)
            .map_err(|error| AppError::Internal(format!("failed to decode created site: {error}")))
    }

    async fn update_site(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        input: SaveSiteInput,
    ) -> AppResult<()> {
        let url = self.company_url(company_id, &["sites", site_id])?;
        self.send_mutation(
            self.request(reqwest::Method::PUT, url).json(&input),
            "update site",
        )
        .await?;
        Ok(())
    }

    async fn delete_site(&self, company_id: &CompanyId, site_id: &str) -> AppResult<()> {
        let url = self.company_url(company_id, &["sites", site_id])?;
        self.send_mutation(self.request(reqwest::Method::DELETE, url), "delete site")
            .await?;
        Ok(())
    }

    async fn create_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        input: SaveSubsiteInput,
    ) -> AppResult<String> {
        let url = self.company_url(company_id, &["sites", site_id, "subsites"])?;
        let response = self
            .send_mutation(
                self.request(reqwest::Method::POST, url).json(&input),
                "create subsite",
            )
            .await?;

        response
            .json::<CreatedDocument>()
            .await
            .map(|created| created.id)
            .map_err(|error| {
                AppError::Internal(format!("failed to decode created subsite: {error}"))
            })
    }

    async fn update_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
        input: SaveSubsiteInput,
    ) -> AppResult<()> {
        let url = self.company_url(company_id, &["sites", site_id, "subsites", subsite_id])?;
        self.send_mutation(
            self.request(reqwest::Method::PUT, url).json(&input),
            "update subsite",
        )
        .await?;
        Ok(())
    }

    async fn delete_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
    ) -> AppResult<()> {
        let url = self.company_url(company_id, &["sites", site_id, "subsites", subsite_id])?;
        self.send_mutation(self.request(reqwest::Method::DELETE, url), "delete subsite")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionTableRepository for HttpRemoteStore {
    async fn find_permission_table(
        &self,
        company_id: &CompanyId,
    ) -> AppResult<Option<PermissionTable>> {
        let url = self.company_url(company_id, &["permissions"])?;
        self.fetch_optional(self.request(reqwest::Method::GET, url), "permission table")
            .await
    }
}

#[cfg(test)]
mod tests {
    use scopewise_core::{AppError, CompanyId};

    use super::HttpRemoteStore;

    fn url(store: &HttpRemoteStore, company_id: &CompanyId, segments: &[&str]) -> String {
        store
            .company_url(company_id, segments)
            .map(|url| url.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn urls_are_rooted_under_the_company() {
        let store = HttpRemoteStore::new(reqwest::Client::new(), "https://data.example.com/v1/", None);
        let company_id = CompanyId::new("acme").unwrap_or_else(|_| unreachable!());

        assert_eq!(
            url(&store, &company_id, &["sites", "s1"]),
            "https://data.example.com/v1/companies/acme/sites/s1"
        );
        assert_eq!(
            url(&store, &company_id, &[]),
            "https://data.example.com/v1/companies/acme"
        );

        let bare = HttpRemoteStore::new(reqwest::Client::new(), "https://data.example.com", None);
        assert_eq!(
            url(&bare, &company_id, &["permissions"]),
            "https://data.example.com/companies/acme/permissions"
        );
    }

    #[test]
    fn ids_are_percent_encoded_as_single_segments() {
        let store = HttpRemoteStore::new(reqwest::Client::new(), "https://data.example.com/v1", None);
        let company_id = CompanyId::new("acme/east").unwrap_or_else(|_| unreachable!());

        assert_eq!(
            url(&store, &company_id, &["sites", "a/b", "subsites", "q?x#1"]),
            "https://data.example.com/v1/companies/acme%2Feast/sites/a%2Fb/subsites/q%3Fx%231"
        );
    }

    #[test]
    fn unusable_base_url_is_rejected() {
        let store = HttpRemoteStore::new(reqwest::Client::new(), "mailto:ops@example.com", None);
        let company_id = CompanyId::new("acme").unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            store.company_url(&company_id, &["sites"]),
            Err(AppError::InvalidInput(_))
        ));
    }
}
