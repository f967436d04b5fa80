//! Facade the session layer talks to: tenant scope, site mutations and access checks.


use std::sync::Arc;

use scopewise_core::{AppError, AppResult, CompanyId, Identity};
use scopewise_domain::{
    PermissionAction, PermissionOverrides, ScopeState, Selection, SelectionOutcome,
    is_owner_role, resolve_module_path, resolve_scope_path,
};
use tracing::{debug, info, warn};

use crate::{
    AccessRequest, HydrationOutcome, HydrationService, PermissionService, RemoteStore,
    SaveSiteInput, SaveSubsiteInput, ScopeHandle, SessionPersistence, SiteCache,
};

/// Application service owning the selected tenant scope of one session.
#[derive(Clone)]
pub struct ContextService {
    scope: ScopeHandle,
    hydration: HydrationService,
    remote_store: Arc<dyn RemoteStore>,
    site_cache: Arc<dyn SiteCache>,
    session: SessionPersistence,
    permissions: PermissionService,
}

impl ContextService {
    /// Creates a context service over a running scope manager.
    #[must_use]
    pub fn new(
        scope: ScopeHandle,
        remote_store: Arc<dyn RemoteStore>,
        site_cache: Arc<dyn SiteCache>,
        session: SessionPersistence,
        permissions: PermissionService,
    ) -> Self {
        let hydration = HydrationService::new(
            remote_store.clone(),
            site_cache.clone(),
            session.clone(),
            scope.clone(),
        );

        Self {
            scope,
            hydration,
            remote_store,
            site_cache,
            session,
            permissions,
        }
    }

    /// Returns the permission service used for checks.
    #[must_use]
    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    /// Returns a copy of the current scope.
    pub async fn snapshot(&self) -> ScopeState {
        self.scope.snapshot().await
    }

    /// Seeds the scope from the persisted session without touching the network.
    ///
    /// Returns the restored company, if one was persisted.
    pub async fn restore_session(&self) -> AppResult<Option<CompanyId>> {
        let snapshot = self.session.load().await?;
        let Some(company_id) = snapshot.company_id else {
            return Ok(None);
        };
        let company_id = CompanyId::new(company_id)?;

        self.scope.set_tenant(company_id.clone()).await?;
        if let Some(site) = snapshot.site {
            self.scope
                .seed_selection(company_id.clone(), site, snapshot.subsite)
                .await?;
        }

        info!(company_id = %company_id, "session restored");
        Ok(Some(company_id))
    }

    /// Selects a company and makes its sites available.
    pub async fn set_tenant(&self, company_id: &str) -> AppResult<HydrationOutcome> {
        let company_id = CompanyId::new(company_id)?;
        let needs_hydration = self.scope.set_tenant(company_id.clone()).await?;

        if let Err(error) = self.session.save_company(&company_id).await {
            warn!(company_id = %company_id, error = %error, "failed to persist company");
        }
        self.load_permissions_in_background(&company_id).await;

        if !needs_hydration {
            debug!(company_id = %company_id, "sites already loaded");
            return Ok(HydrationOutcome::AlreadyLoaded);
        }

        self.hydration.hydrate(&company_id).await
    }

    /// Selects a site of the active company.
    pub async fn select_site(&self, site_id: &str, name: &str) -> AppResult<SelectionOutcome> {
        let outcome = self.scope.select_site(site_id, name).await?;

        if outcome == SelectionOutcome::Optimistic {
            let error = AppError::NotFound(format!("site '{site_id}' is not loaded"));
            warn!(error = %error, "site selected without site data");
        }

        persist(
            self.session
                .save_site(Some(&Selection::new(site_id, name)))
                .await,
        );
        Ok(outcome)
    }

    /// Selects a subsite of the selected site and loads its storage override.
    pub async fn select_subsite(&self, subsite_id: &str, name: &str) -> AppResult<SelectionOutcome> {
        let outcome = self.scope.select_subsite(subsite_id, name).await?;

        if outcome == SelectionOutcome::NotApplied {
            let error = AppError::NotFound(format!("subsite '{subsite_id}' is not in the selected site"));
            warn!(error = %error, "subsite selection ignored");
            return Ok(outcome);
        }

        persist(
            self.session
                .save_subsite(Some(&Selection::new(subsite_id, name)))
                .await,
        );
        self.load_subsite_override_in_background().await;
        Ok(outcome)
    }

    /// Selects a team under the selected site.
    pub async fn select_team(&self, team_id: &str, name: &str) -> AppResult<()> {
        self.scope.select_team(team_id, name).await
    }

    /// Drops site, subsite and team while keeping the company.
    pub async fn clear_selection(&self) -> AppResult<()> {
        self.scope.clear_selection().await?;
        persist(self.session.save_site(None).await);
        Ok(())
    }

    /// Returns to the empty scope and forgets everything cached for the company.
    pub async fn sign_out(&self) -> AppResult<()> {
        let company_id = self.scope.active_company().await;
        self.scope.reset().await?;
        persist(self.session.clear().await);

        if let Some(company_id) = company_id {
            if let Err(error) = self.site_cache.invalidate(&company_id).await {
                warn!(company_id = %company_id, error = %error, "failed to invalidate site cache");
            }
            self.permissions.evict(&company_id).await;
            info!(company_id = %company_id, "signed out");
        }

        Ok(())
    }

    /// Refetches the active company's sites.
    pub async fn refresh_sites(&self, force: bool) -> AppResult<usize> {
        let company_id = self.require_company().await?;
        self.hydration.refresh(&company_id, force).await
    }

    /// Creates a site and reloads the site list.
    pub async fn create_site(&self, input: SaveSiteInput) -> AppResult<String> {
        let company_id = self.require_company().await?;
        let site_id = self.remote_store.create_site(&company_id, input).await?;
        info!(company_id = %company_id, site_id = %site_id, "site created");

        self.hydration.refresh(&company_id, true).await?;
        Ok(site_id)
    }

    /// Updates a site and reloads the site list.
    pub async fn update_site(&self, site_id: &str, input: SaveSiteInput) -> AppResult<()> {
        let company_id = self.require_company().await?;
        self.remote_store
            .update_site(&company_id, site_id, input)
            .await?;

        self.hydration.refresh(&company_id, true).await?;
        Ok(())
    }

    /// Deletes a site, dropping the selection when it pointed at that site.
    pub async fn delete_site(&self, site_id: &str) -> AppResult<()> {
        let company_id = self.require_company().await?;
        self.remote_store.delete_site(&company_id, site_id).await?;
        info!(company_id = %company_id, site_id, "site deleted");

        let selected = self.scope.snapshot().await;
        if selected.site().is_some_and(|site| site.id == site_id) {
            self.clear_selection().await?;
        }

        self.hydration.refresh(&company_id, true).await?;
        Ok(())
    }

    /// Creates a subsite and reloads the site list.
    pub async fn create_subsite(&self, site_id: &str, input: SaveSubsiteInput) -> AppResult<String> {
        let company_id = self.require_company().await?;
        let subsite_id = self
            .remote_store
            .create_subsite(&company_id, site_id, input)
            .await?;
        info!(company_id = %company_id, site_id, subsite_id = %subsite_id, "subsite created");

        self.hydration.refresh(&company_id, true).await?;
        Ok(subsite_id)
    }

    /// Updates a subsite and reloads the site list.
    pub async fn update_subsite(
        &self,
        site_id: &str,
        subsite_id: &str,
        input: SaveSubsiteInput,
    ) -> AppResult<()> {
        let company_id = self.require_company().await?;
        self.remote_store
            .update_subsite(&company_id, site_id, subsite_id, input)
            .await?;

        self.hydration.refresh(&company_id, true).await?;
        Ok(())
    }

    /// Deletes a subsite and reloads the site list.
    pub async fn delete_subsite(&self, site_id: &str, subsite_id: &str) -> AppResult<()> {
        let company_id = self.require_company().await?;
        self.remote_store
            .delete_subsite(&company_id, site_id, subsite_id)
            .await?;
        info!(company_id = %company_id, site_id, subsite_id, "subsite deleted");

        let selected = self.scope.snapshot().await;
        if selected
            .subsite()
            .is_some_and(|subsite| subsite.id == subsite_id)
        {
            persist(self.session.save_subsite(None).await);
        }

        self.hydration.refresh(&company_id, true).await?;
        Ok(())
    }

    /// Storage path of the current scope.
    pub async fn scope_path(&self) -> Option<String> {
        resolve_scope_path(&self.scope.snapshot().await)
    }

    /// Storage path for a module's data in the current scope.
    pub async fn module_path(&self, module: &str) -> Option<String> {
        resolve_module_path(&self.scope.snapshot().await, module)
    }

    /// Checks access in the active company. Without one only owners pass.
    pub async fn can(
        &self,
        identity: &Identity,
        module: &str,
        page: &str,
        action: PermissionAction,
    ) -> bool {
        let Some(company_id) = self.scope.active_company().await else {
            return is_owner_role(identity.role());
        };

        self.permissions
            .check(
                identity,
                &company_id,
                AccessRequest::new(module, page, action),
                PermissionOverrides::default(),
            )
            .await
    }

    async fn require_company(&self) -> AppResult<CompanyId> {
        self.scope
            .active_company()
            .await
            .ok_or_else(|| AppError::InvalidInput("no company selected".to_owned()))
    }

    async fn load_permissions_in_background(&self, company_id: &CompanyId) {
        if self.permissions.table(company_id).await.is_some() {
            return;
        }

        let permissions = self.permissions.clone();
        let company_id = company_id.clone();
        tokio::spawn(async move {
            if let Err(error) = permissions.refresh_table(&company_id).await {
                warn!(company_id = %company_id, error = %error, "failed to load permission table");
            }
        });
    }

    async fn load_subsite_override_in_background(&self) {
        let scope = self.scope.snapshot().await;
        let (Some(company_id), Some(site), Some(subsite)) =
            (scope.company_id(), scope.site(), scope.subsite())
        else {
            return;
        };

        let company_id = company_id.clone();
        let site_id = site.id.clone();
        let subsite_id = subsite.id.clone();
        let remote_store = self.remote_store.clone();
        let handle = self.scope.clone();

        tokio::spawn(async move {
            let config = match remote_store
                .fetch_subsite_config(&company_id, &site_id, &subsite_id)
                .await
            {
                Ok(Some(config)) => config,
                Ok(None) => return,
                Err(error) => {
                    warn!(
                        company_id = %company_id,
                        site_id = %site_id,
                        subsite_id = %subsite_id,
                        error = %error,
                        "failed to fetch subsite config"
                    );
                    return;
                }
            };

            match handle
                .apply_subsite_override(company_id.clone(), site_id.clone(), subsite_id.clone(), config)
                .await
            {
                Ok(true) => debug!(company_id = %company_id, subsite_id = %subsite_id, "subsite config applied"),
                Ok(false) => {
                    let error = AppError::StaleOverride(format!(
                        "subsite '{site_id}/{subsite_id}' is no longer selected"
                    ));
                    debug!(company_id = %company_id, error = %error, "discarding subsite config");
                }
                Err(error) => warn!(company_id = %company_id, error = %error, "failed to apply subsite config"),
            }
        });
    }
}

fn persist(result: AppResult<()>) {
    if let Err(error) = result {
        warn!(error = %error, "failed to persist session selection");
    }
}
