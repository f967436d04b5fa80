//! Cache-then-network loading of a company's site list.

mod in_flight;


use std::sync::Arc;

use scopewise_core::{AppError, AppResult, CompanyId};
use scopewise_domain::{Site, has_usable_subsite_data};
use tracing::{debug, info, warn};

use crate::{RemoteStore, ScopeHandle, SessionPersistence, SiteCache};

use in_flight::{ActiveHydrations, FetchSequence, FetchedSites, InFlightFetches};

/// How a hydration request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// The company's sites were already loaded; nothing was scheduled.
    AlreadyLoaded,
    /// A hydration for the company was already running.
    AlreadyInFlight,
    /// Cached sites were shown; the remote refresh continues in the background.
    ServedFromCache,
    /// No usable cache; the remote fetch completed before returning.
    Fetched,
}

/// Loads site lists into the scope from the local cache and the remote store.
#[derive(Clone)]
pub struct HydrationService {
    remote_store: Arc<dyn RemoteStore>,
    site_cache: Arc<dyn SiteCache>,
    session: SessionPersistence,
    scope: ScopeHandle,
    fetches: Arc<InFlightFetches>,
    sequence: Arc<FetchSequence>,
    hydrations: Arc<ActiveHydrations>,
}

impl HydrationService {
    /// Creates a hydration service.
    #[must_use]
    pub fn new(
        remote_store: Arc<dyn RemoteStore>,
        site_cache: Arc<dyn SiteCache>,
        session: SessionPersistence,
        scope: ScopeHandle,
    ) -> Self {
        Self {
            remote_store,
            site_cache,
            session,
            scope,
            fetches: Arc::new(InFlightFetches::default()),
            sequence: Arc::new(FetchSequence::default()),
            hydrations: Arc::new(ActiveHydrations::default()),
        }
    }

    /// Returns whether a hydration for the company has not settled yet.
    pub async fn is_hydrating(&self, company_id: &CompanyId) -> bool {
        self.hydrations.contains(company_id).await
    }

    /// Makes the company's sites available to the scope.
    ///
    /// A usable cache entry is dispatched immediately and the remote fetch is
    /// deferred to a background task. Without one the remote fetch is awaited
    /// and its failure is returned as [`AppError::FetchFailed`].
    pub async fn hydrate(&self, company_id: &CompanyId) -> AppResult<HydrationOutcome> {
        if !self.hydrations.begin(company_id).await {
            debug!(company_id = %company_id, "hydration already in flight");
            return Ok(HydrationOutcome::AlreadyInFlight);
        }

        match self.read_usable_cache(company_id).await {
            Some(cached) => {
                let site_count = cached.len();
                if let Err(error) = self.scope.replace_sites(company_id.clone(), cached).await {
                    self.hydrations.finish(company_id).await;
                    return Err(error);
                }
                info!(company_id = %company_id, site_count, "serving cached sites");

                let service = self.clone();
                let company_id = company_id.clone();
                tokio::spawn(async move {
                    if let Err(error) = service.reconcile(&company_id, false).await {
                        warn!(
                            company_id = %company_id,
                            error = %error,
                            "background site refresh failed, keeping cached sites"
                        );
                    }
                    service.hydrations.finish(&company_id).await;
                });

                Ok(HydrationOutcome::ServedFromCache)
            }
            None => {
                let result = self.reconcile(company_id, false).await;
                self.hydrations.finish(company_id).await;

                result.map(|_| HydrationOutcome::Fetched).map_err(|error| {
                    warn!(company_id = %company_id, error = %error, "site hydration failed");
                    match error {
                        AppError::FetchFailed(_) => error,
                        other => AppError::FetchFailed(other.to_string()),
                    }
                })
            }
        }
    }

    /// Fetches the company's sites from the remote store and reconciles the scope.
    ///
    /// Without `force` the call joins a fetch already running for the company.
    /// A result older than one already applied is dropped without touching the
    /// scope or the cache. Returns the number of sites received.
    pub async fn refresh(&self, company_id: &CompanyId, force: bool) -> AppResult<usize> {
        self.reconcile(company_id, force).await
    }

    async fn read_usable_cache(&self, company_id: &CompanyId) -> Option<Vec<Site>> {
        let cached = match self.site_cache.get(company_id).await {
            Ok(cached) => cached?,
            Err(error) => {
                warn!(company_id = %company_id, error = %error, "failed to read site cache");
                return None;
            }
        };

        if has_usable_subsite_data(&cached) {
            return Some(cached);
        }

        debug!(
            company_id = %company_id,
            "cached sites carry no subsite data, treating entry as stale"
        );
        None
    }

    async fn reconcile(&self, company_id: &CompanyId, force: bool) -> AppResult<usize> {
        let FetchedSites { ticket, sites } = self.fetch_sites(company_id, force).await?;
        let site_count = sites.len();

        let Some(claim) = self.sequence.claim(company_id, ticket).await else {
            debug!(company_id = %company_id, ticket, "discarding superseded site fetch");
            return Ok(site_count);
        };

        let applied = self
            .scope
            .replace_sites(company_id.clone(), sites.as_ref().clone())
            .await?;

        if let Err(error) = self.site_cache.put(company_id, &sites).await {
            warn!(company_id = %company_id, error = %error, "failed to write site cache");
        }
        drop(claim);

        if applied {
            self.restore_persisted_selection(company_id).await;
            self.refresh_tenant_config(company_id).await;
        }

        debug!(company_id = %company_id, site_count, applied, "site list reconciled");
        Ok(site_count)
    }

    async fn fetch_sites(&self, company_id: &CompanyId, force: bool) -> AppResult<FetchedSites> {
        if force {
            let ticket = self.sequence.issue(company_id).await;
            return self
                .remote_store
                .fetch_sites(company_id)
                .await
                .map(|sites| FetchedSites {
                    ticket,
                    sites: Arc::new(sites),
                })
                .map_err(|error| fetch_failed(company_id, &error.to_string()));
        }

        let cell = self.fetches.join_or_start(company_id).await;
        let outcome = cell
            .get_or_init(|| async {
                let ticket = self.sequence.issue(company_id).await;
                self.remote_store
                    .fetch_sites(company_id)
                    .await
                    .map(|sites| FetchedSites {
                        ticket,
                        sites: Arc::new(sites),
                    })
                    .map_err(|error| error.to_string())
            })
            .await
            .clone();
        self.fetches.release(company_id, &cell).await;

        outcome.map_err(|error| fetch_failed(company_id, error.as_str()))
    }

    async fn restore_persisted_selection(&self, company_id: &CompanyId) {
        let snapshot = match self.session.load().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(company_id = %company_id, error = %error, "failed to read session");
                return;
            }
        };

        let (true, Some(site)) = (snapshot.belongs_to(company_id), snapshot.site) else {
            return;
        };

        match self
            .scope
            .restore_selection(company_id.clone(), site, snapshot.subsite)
            .await
        {
            Ok(restored) => debug!(company_id = %company_id, restored, "session restore checked"),
            Err(error) => warn!(company_id = %company_id, error = %error, "session restore failed"),
        }
    }

    async fn refresh_tenant_config(&self, company_id: &CompanyId) {
        match self.remote_store.fetch_tenant(company_id).await {
            Ok(Some(tenant)) => {
                if let Err(error) = self
                    .scope
                    .apply_tenant_config(company_id.clone(), tenant.data_management)
                    .await
                {
                    warn!(company_id = %company_id, error = %error, "failed to apply tenant config");
                }
            }
            Ok(None) => debug!(company_id = %company_id, "no tenant document found"),
            Err(error) => {
                warn!(company_id = %company_id, error = %error, "failed to fetch tenant config");
            }
        }
    }
}

fn fetch_failed(company_id: &CompanyId, detail: &str) -> AppError {
    AppError::FetchFailed(format!(
        "failed to fetch sites for company '{company_id}': {detail}"
    ))
}
