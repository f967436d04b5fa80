use std::sync::Arc;

use scopewise_core::{AppError, Identity};
use scopewise_domain::{PagePermission, PermissionAction, PermissionOverrides, PermissionTable};

use crate::test_fakes::{FakePermissionTableRepository, company};

use super::{AccessRequest, PermissionPolicy, PermissionService};

fn kitchen_table() -> PermissionTable {
    PermissionTable::default()
        .with_role_page("staff", "pos", "sales", PagePermission::new(true, false, false))
        .with_department_page("kitchen", "stock", "orders", PagePermission::new(true, true, false))
}

async fn service_with(table: PermissionTable, policy: PermissionPolicy) -> PermissionService {
    let repository = FakePermissionTableRepository::default();
    repository.tables.lock().await.insert(company("acme"), table);
    PermissionService::new(Arc::new(repository), policy)
}

#[tokio::test]
async fn loaded_table_merges_role_and_department() {
    let service = service_with(kitchen_table(), PermissionPolicy::default()).await;
    let acme = company("acme");
    assert!(service.refresh_table(&acme).await.is_ok());
    let identity = Identity::new("u-1", "staff", "kitchen");

    let view_sales = AccessRequest::new("pos", "sales", PermissionAction::View);
    let edit_sales = AccessRequest::new("pos", "sales", PermissionAction::Edit);
    let edit_orders = AccessRequest::new("stock", "orders", PermissionAction::Edit);

    assert!(service.check(&identity, &acme, view_sales, PermissionOverrides::default()).await);
    assert!(!service.check(&identity, &acme, edit_sales, PermissionOverrides::default()).await);
    assert!(service.check(&identity, &acme, edit_orders, PermissionOverrides::default()).await);
}

#[tokio::test]
async fn loading_state_follows_policy() {
    let identity = Identity::new("u-1", "staff", "kitchen");
    let request = AccessRequest::new("pos", "refunds", PermissionAction::Delete);
    let acme = company("acme");

    let open = service_with(kitchen_table(), PermissionPolicy::default()).await;
    assert!(open.check(&identity, &acme, request, PermissionOverrides::default()).await);

    let closed = service_with(
        kitchen_table(),
        PermissionPolicy {
            fail_open_while_loading: false,
        },
    )
    .await;
    assert!(!closed.check(&identity, &acme, request, PermissionOverrides::default()).await);

    assert!(open.refresh_table(&acme).await.is_ok());
    assert!(!open.check(&identity, &acme, request, PermissionOverrides::default()).await);
}

#[tokio::test]
async fn missing_table_denies_everyone_but_owners() {
    let service = PermissionService::new(
        Arc::new(FakePermissionTableRepository::default()),
        PermissionPolicy::default(),
    );
    let acme = company("acme");
    assert!(service.refresh_table(&acme).await.is_ok());
    let request = AccessRequest::new("company", "setup", PermissionAction::Edit);

    let staff = Identity::new("u-1", "staff", "kitchen");
    let owner = Identity::new("u-0", "Owner", "");
    assert!(!service.check(&staff, &acme, request, PermissionOverrides::default()).await);
    assert!(service.check(&owner, &acme, request, PermissionOverrides::default()).await);
}

#[tokio::test]
async fn require_reports_forbidden() {
    let service = service_with(kitchen_table(), PermissionPolicy::default()).await;
    let acme = company("acme");
    assert!(service.refresh_table(&acme).await.is_ok());
    let identity = Identity::new("u-1", "staff", "kitchen");

    let result = service
        .require(
            &identity,
            &acme,
            AccessRequest::new("pos", "sales", PermissionAction::Delete),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn accessible_pages_are_empty_until_loaded() {
    let service = service_with(kitchen_table(), PermissionPolicy::default()).await;
    let acme = company("acme");
    let identity = Identity::new("u-1", "staff", "kitchen");

    assert!(service.accessible_pages(&identity, &acme, "stock").await.is_empty());

    assert!(service.refresh_table(&acme).await.is_ok());
    let pages = service.accessible_pages(&identity, &acme, "stock").await;
    assert_eq!(pages.into_iter().collect::<Vec<_>>(), vec!["orders".to_owned()]);

    service.evict(&acme).await;
    assert!(service.table(&acme).await.is_none());
}

#[tokio::test]
async fn failed_table_load_denies_until_a_reload_succeeds() {
    let repository = Arc::new(FakePermissionTableRepository::default());
    repository.tables.lock().await.insert(company("acme"), kitchen_table());
    *repository.failing.lock().await = true;
    let service = PermissionService::new(repository.clone(), PermissionPolicy::default());
    let acme = company("acme");
    let staff = Identity::new("u-1", "staff", "kitchen");
    let owner = Identity::new("u-0", "owner", "");
    let delete_payroll = AccessRequest::new("hr", "payroll", PermissionAction::Delete);
    let view_sales = AccessRequest::new("pos", "sales", PermissionAction::View);

    assert!(service.is_loading(&acme).await);
    assert!(matches!(service.refresh_table(&acme).await, Err(AppError::Internal(_))));
    assert!(!service.is_loading(&acme).await);
    assert!(!service.check(&staff, &acme, delete_payroll, PermissionOverrides::default()).await);
    assert!(!service.check(&staff, &acme, view_sales, PermissionOverrides::default()).await);
    assert!(service.check(&owner, &acme, delete_payroll, PermissionOverrides::default()).await);
    assert!(service.accessible_pages(&staff, &acme, "pos").await.is_empty());

    *repository.failing.lock().await = false;
    assert!(service.refresh_table(&acme).await.is_ok());
    assert!(service.check(&staff, &acme, view_sales, PermissionOverrides::default()).await);

    *repository.failing.lock().await = true;
    assert!(service.refresh_table(&acme).await.is_err());
    assert!(service.check(&staff, &acme, view_sales, PermissionOverrides::default()).await);
}
