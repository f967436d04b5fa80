use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use scopewise_core::{AppError, AppResult, CompanyId, Identity};
use scopewise_domain::{
    PermissionAction, PermissionOverrides, PermissionTable, is_owner_role,
    resolve_with_overrides, viewable_pages,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::PermissionTableRepository;

#[cfg(test)]
mod tests;

/// Behaviour of permission checks while a tenant's table is not loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionPolicy {
    /// Allow every check until the table arrives.
    ///
    /// Keeps screens usable during startup at the cost of briefly showing
    /// actions the subject may not hold. Disable for backend enforcement.
    pub fail_open_while_loading: bool,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            fail_open_while_loading: true,
        }
    }
}

/// One module page action being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest<'a> {
    /// Module key.
    pub module: &'a str,
    /// Page key within the module.
    pub page: &'a str,
    /// Requested action.
    pub action: PermissionAction,
}

impl<'a> AccessRequest<'a> {
    /// Creates an access request.
    #[must_use]
    pub fn new(module: &'a str, page: &'a str, action: PermissionAction) -> Self {
        Self {
            module,
            page,
            action,
        }
    }
}

/// Load state of one company's table. Absent from the map means still loading.
#[derive(Debug, Clone)]
enum TableState {
    Loaded(Arc<PermissionTable>),
    Failed,
}

/// Application service answering access checks against loaded tenant tables.
#[derive(Clone)]
pub struct PermissionService {
    repository: Arc<dyn PermissionTableRepository>,
    tables: Arc<RwLock<HashMap<CompanyId, TableState>>>,
    policy: PermissionPolicy,
}

impl PermissionService {
    /// Creates a permission service.
    #[must_use]
    pub fn new(repository: Arc<dyn PermissionTableRepository>, policy: PermissionPolicy) -> Self {
        Self {
            repository,
            tables: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// Loads or reloads the permission table of a company.
    ///
    /// A company without a stored table gets an empty one, which denies
    /// everything except owners. A failed first load leaves the company in a
    /// failed state where every non-owner check is denied; a failed reload
    /// keeps the previously loaded table.
    pub async fn refresh_table(&self, company_id: &CompanyId) -> AppResult<()> {
        let table = match self.repository.find_permission_table(company_id).await {
            Ok(table) => table.unwrap_or_default(),
            Err(error) => {
                let mut tables = self.tables.write().await;
                if !matches!(tables.get(company_id), Some(TableState::Loaded(_))) {
                    tables.insert(company_id.clone(), TableState::Failed);
                }
                return Err(error);
            }
        };

        debug!(
            company_id = %company_id,
            roles = table.roles.len(),
            departments = table.departments.len(),
            "permission table loaded"
        );
        self.tables
            .write()
            .await
            .insert(company_id.clone(), TableState::Loaded(Arc::new(table)));
        Ok(())
    }

    /// Returns the loaded table of a company.
    pub async fn table(&self, company_id: &CompanyId) -> Option<Arc<PermissionTable>> {
        match self.tables.read().await.get(company_id) {
            Some(TableState::Loaded(table)) => Some(Arc::clone(table)),
            Some(TableState::Failed) | None => None,
        }
    }

    /// Returns whether the company's table has neither loaded nor failed yet.
    pub async fn is_loading(&self, company_id: &CompanyId) -> bool {
        !self.tables.read().await.contains_key(company_id)
    }

    /// Drops the loaded table of a company.
    pub async fn evict(&self, company_id: &CompanyId) {
        self.tables.write().await.remove(company_id);
    }

    /// Returns whether the identity may perform the requested action.
    pub async fn check(
        &self,
        identity: &Identity,
        company_id: &CompanyId,
        request: AccessRequest<'_>,
        overrides: PermissionOverrides<'_>,
    ) -> bool {
        if is_owner_role(identity.role()) {
            return true;
        }

        let state = self.tables.read().await.get(company_id).cloned();
        let table = match state {
            Some(TableState::Loaded(table)) => table,
            Some(TableState::Failed) => {
                debug!(
                    company_id = %company_id,
                    uid = identity.uid(),
                    "permission table unavailable, denying access"
                );
                return false;
            }
            None => return self.while_loading(identity, company_id, request),
        };

        resolve_with_overrides(
            identity,
            &table,
            request.module,
            request.page,
            request.action,
            overrides,
        )
    }

    /// Same as [`PermissionService::check`] but denial becomes [`AppError::Forbidden`].
    pub async fn require(
        &self,
        identity: &Identity,
        company_id: &CompanyId,
        request: AccessRequest<'_>,
    ) -> AppResult<()> {
        if self
            .check(identity, company_id, request, PermissionOverrides::default())
            .await
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' may not {} '{}/{}' in company '{company_id}'",
            identity.uid(),
            request.action.as_str(),
            request.module,
            request.page
        )))
    }

    /// Lists the pages of a module the identity can view.
    ///
    /// Empty while the company's table is not loaded or failed to load.
    pub async fn accessible_pages(
        &self,
        identity: &Identity,
        company_id: &CompanyId,
        module: &str,
    ) -> BTreeSet<String> {
        match self.table(company_id).await {
            Some(table) => viewable_pages(identity, &table, module),
            None => BTreeSet::new(),
        }
    }

    fn while_loading(
        &self,
        identity: &Identity,
        company_id: &CompanyId,
        request: AccessRequest<'_>,
    ) -> bool {
        if self.policy.fail_open_while_loading {
            warn!(
                company_id = %company_id,
                uid = identity.uid(),
                module = request.module,
                page = request.page,
                action = request.action.as_str(),
                "permission table still loading, allowing access"
            );
            return true;
        }

        debug!(
            company_id = %company_id,
            uid = identity.uid(),
            "permission table still loading, denying access"
        );
        false
    }
}
