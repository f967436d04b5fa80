use crate::{ScopeState, StorageScope};

/// Modules whose data always lives at the company level.
pub const TENANT_SCOPED_MODULES: &[&str] = &[
    "settings",
    "messaging",
    "notifications",
    "analytics",
    "assistant",
];

/// Resolves the storage path of the current selection.
///
/// Returns `None` while no company is selected.
#[must_use]
pub fn resolve_scope_path(scope: &ScopeState) -> Option<String> {
    build_path(scope, StorageScope::Subsite)
}

/// Resolves the storage path a module reads and writes for the current selection.
///
/// Company-wide modules always get the company path; every other module is
/// capped at the storage scope configured for it.
#[must_use]
pub fn resolve_module_path(scope: &ScopeState, module: &str) -> Option<String> {
    let module = module.trim();
    if TENANT_SCOPED_MODULES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(module))
    {
        return build_path(scope, StorageScope::Company);
    }

    let depth = scope
        .effective_config()
        .scope_for(module)
        .unwrap_or(StorageScope::Subsite);
    build_path(scope, depth)
}

fn build_path(scope: &ScopeState, depth: StorageScope) -> Option<String> {
    let company_id = scope.company_id()?;
    let mut path = format!("tenant/{company_id}");

    if depth == StorageScope::Company {
        return Some(path);
    }

    let Some(site) = scope.site() else {
        return Some(path);
    };
    path.push_str("/sites/");
    path.push_str(site.id.as_str());

    if depth == StorageScope::Site {
        return Some(path);
    }

    if let Some(subsite) = scope.subsite() {
        path.push_str("/subsites/");
        path.push_str(subsite.id.as_str());
    }

    Some(path)
}

#[cfg(test)]
mod tests {
    use scopewise_core::CompanyId;

    use super::{resolve_module_path, resolve_scope_path};
    use crate::{DataManagementConfig, ScopeState, Site, StorageScope, SubsiteRecord};

    fn scope_with(site: Option<&str>, subsite: Option<&str>) -> ScopeState {
        let mut scope = ScopeState::new();
        if let Ok(company_id) = CompanyId::new("acme") {
            scope.set_tenant(company_id);
        }
        scope.set_sites(vec![
            Site::new("s1", "Main").with_subsite("b1", SubsiteRecord::new("b1", "Bar")),
        ]);
        if let Some(site_id) = site {
            assert!(scope.select_site(site_id, "Main").is_ok());
        }
        if let Some(subsite_id) = subsite {
            assert!(scope.select_subsite(subsite_id, "Bar").is_ok());
        }
        scope
    }

    #[test]
    fn path_follows_selection_depth() {
        assert_eq!(
            resolve_scope_path(&scope_with(None, None)).as_deref(),
            Some("tenant/acme")
        );
        assert_eq!(
            resolve_scope_path(&scope_with(Some("s1"), None)).as_deref(),
            Some("tenant/acme/sites/s1")
        );
        assert_eq!(
            resolve_scope_path(&scope_with(Some("s1"), Some("b1"))).as_deref(),
            Some("tenant/acme/sites/s1/subsites/b1")
        );
    }

    #[test]
    fn no_company_means_no_path() {
        assert_eq!(resolve_scope_path(&ScopeState::new()), None);
    }

    #[test]
    fn tenant_scoped_modules_ignore_selection() {
        let scope = scope_with(Some("s1"), Some("b1"));
        for module in ["settings", "Messaging", "notifications", "analytics", "assistant"] {
            assert_eq!(
                resolve_module_path(&scope, module).as_deref(),
                Some("tenant/acme"),
                "{module} must resolve at company level"
            );
        }
        assert_eq!(
            resolve_module_path(&scope, "checklists").as_deref(),
            Some("tenant/acme/sites/s1/subsites/b1")
        );
    }

    #[test]
    fn configured_storage_scope_caps_module_path() {
        let mut scope = scope_with(Some("s1"), Some("b1"));
        scope.apply_tenant_config(
            DataManagementConfig::new()
                .with_module("stock", StorageScope::Site)
                .with_module("hr", StorageScope::Company),
        );

        assert_eq!(
            resolve_module_path(&scope, "stock").as_deref(),
            Some("tenant/acme/sites/s1")
        );
        assert_eq!(resolve_module_path(&scope, "hr").as_deref(), Some("tenant/acme"));
    }
}
