use async_trait::async_trait;
use scopewise_core::{AppResult, CompanyId};
use scopewise_domain::PermissionTable;

/// Repository port for per-tenant permission tables.
#[async_trait]
pub trait PermissionTableRepository: Send + Sync {
    /// Returns the permission table stored for a company.
    async fn find_permission_table(
        &self,
        company_id: &CompanyId,
    ) -> AppResult<Option<PermissionTable>>;
}
