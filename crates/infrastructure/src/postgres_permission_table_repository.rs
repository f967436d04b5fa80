use async_trait::async_trait;
use scopewise_application::PermissionTableRepository;
use scopewise_core::{AppError, AppResult, CompanyId};
use scopewise_domain::PermissionTable;
use sqlx::PgPool;
use sqlx::types::Json;


/// PostgreSQL-backed permission table repository.
///
/// One JSONB document per company, shaped like the remote permission table.
#[derive(Clone)]
pub struct PostgresPermissionTableRepository {
    pool: PgPool,
}

impl PostgresPermissionTableRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores or replaces the permission table of a company.
    pub async fn save_permission_table(
        &self,
        company_id: &CompanyId,
        table: &PermissionTable,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company_permissions (company_id, permissions, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (company_id)
            DO UPDATE SET permissions = EXCLUDED.permissions, updated_at = now()
            "#,
        )
        .bind(company_id.as_str())
        .bind(Json(table))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save permission table for company '{company_id}': {error}"
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl PermissionTableRepository for PostgresPermissionTableRepository {
    async fn find_permission_table(
        &self,
        company_id: &CompanyId,
    ) -> AppResult<Option<PermissionTable>> {
        let table = sqlx::query_scalar::<_, Json<PermissionTable>>(
            r#"
            SELECT permissions
            FROM company_permissions
            WHERE company_id = $1
            "#,
        )
        .bind(company_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load permission table for company '{company_id}': {error}"
            ))
        })?;

        Ok(table.map(|Json(table)| table))
    }
}
