//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod data_management;
mod path;
mod permission;
mod scope;
mod site;

pub use data_management::{DataManagementConfig, StorageScope, Tenant};
pub use path::{TENANT_SCOPED_MODULES, resolve_module_path, resolve_scope_path};
pub use permission::{
    COMPANY_MODULE, ModulePermissions, PagePermission, PermissionAction, PermissionOverrides,
    PermissionTable, company_page_alias, is_owner_role, resolve, resolve_with_overrides,
    viewable_pages,
};
pub use scope::{ScopeState, Selection, SelectionOutcome};
pub use site::{
    Site, Subsite, SubsiteRecord, Team, find_site, has_usable_subsite_data, normalize_subsites,
};
