use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use scopewise_core::{AppError, Identity};
use serde::{Deserialize, Serialize};

/// Module whose page keys were renamed and keep legacy aliases.
pub const COMPANY_MODULE: &str = "company";

/// `(current, legacy)` page keys of the company module.
const COMPANY_PAGE_ALIASES: &[(&str, &str)] = &[
    ("dashboard", "overview"),
    ("siteManagement", "sites"),
    ("checklists", "checklist"),
    ("permissions", "userPermissions"),
    ("setup", "companySetup"),
    ("dataManagement", "dataConfiguration"),
];

/// Normalized role spellings that always bypass the permission table.
const OWNER_ROLES: &[&str] = &[
    "owner",
    "company_owner",
    "business_owner",
    "account_owner",
    "super_admin",
];

/// Action checked against a page grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    /// Read access.
    View,
    /// Modify access.
    Edit,
    /// Removal access.
    Delete,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::View, Self::Edit, Self::Delete]
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::InvalidInput(format!(
                "unknown permission action '{value}'"
            ))),
        }
    }
}

/// Grants for a single page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePermission {
    /// Read access.
    #[serde(default)]
    pub view: bool,
    /// Modify access.
    #[serde(default)]
    pub edit: bool,
    /// Removal access.
    #[serde(default)]
    pub delete: bool,
}

impl PagePermission {
    /// Creates a page grant.
    #[must_use]
    pub fn new(view: bool, edit: bool, delete: bool) -> Self {
        Self { view, edit, delete }
    }

    /// Returns whether the action is granted.
    #[must_use]
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.view,
            PermissionAction::Edit => self.edit,
            PermissionAction::Delete => self.delete,
        }
    }
}

/// Module → page → grant map held by one role or department.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePermissions {
    modules: BTreeMap<String, BTreeMap<String, PagePermission>>,
}

impl ModulePermissions {
    /// Creates an empty grant set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grant set with one page grant added.
    #[must_use]
    pub fn with_page(
        mut self,
        module: impl Into<String>,
        page: impl Into<String>,
        permission: PagePermission,
    ) -> Self {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(page.into(), permission);
        self
    }

    /// Resolves the grant cell for a page.
    ///
    /// Company pages fall back to their alias in either direction.
    #[must_use]
    pub fn page(&self, module: &str, page: &str) -> Option<PagePermission> {
        let pages = self.modules.get(module)?;
        if let Some(permission) = pages.get(page) {
            return Some(*permission);
        }

        if module == COMPANY_MODULE {
            return company_page_alias(page).and_then(|alias| pages.get(alias).copied());
        }

        None
    }

    /// Returns whether the action is granted on the page.
    #[must_use]
    pub fn grants(&self, module: &str, page: &str, action: PermissionAction) -> bool {
        self.page(module, page)
            .is_some_and(|permission| permission.allows(action))
    }

    fn page_keys(&self, module: &str) -> impl Iterator<Item = &str> {
        self.modules
            .get(module)
            .into_iter()
            .flat_map(|pages| pages.keys().map(String::as_str))
    }
}

/// Per-tenant role and department permission table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionTable {
    /// Grants keyed by role.
    #[serde(default)]
    pub roles: BTreeMap<String, ModulePermissions>,
    /// Grants keyed by department.
    #[serde(default)]
    pub departments: BTreeMap<String, ModulePermissions>,
    /// Role used when the subject's role has no entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,
    /// Department used when the subject's department has no entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_department: Option<String>,
}

impl PermissionTable {
    /// Returns the table with one role page grant added.
    #[must_use]
    pub fn with_role_page(
        mut self,
        role: &str,
        module: &str,
        page: &str,
        permission: PagePermission,
    ) -> Self {
        let entry = self.roles.remove(role).unwrap_or_default();
        self.roles
            .insert(role.to_owned(), entry.with_page(module, page, permission));
        self
    }

    /// Returns the table with one department page grant added.
    #[must_use]
    pub fn with_department_page(
        mut self,
        department: &str,
        module: &str,
        page: &str,
        permission: PagePermission,
    ) -> Self {
        let entry = self.departments.remove(department).unwrap_or_default();
        self.departments
            .insert(department.to_owned(), entry.with_page(module, page, permission));
        self
    }

    /// Returns the grants for a role, falling back to the default role.
    #[must_use]
    pub fn role_permissions(&self, role: &str) -> Option<&ModulePermissions> {
        lookup(&self.roles, role).or_else(|| {
            self.default_role
                .as_deref()
                .and_then(|fallback| lookup(&self.roles, fallback))
        })
    }

    /// Returns the grants for a department, falling back to the default department.
    #[must_use]
    pub fn department_permissions(&self, department: &str) -> Option<&ModulePermissions> {
        lookup(&self.departments, department).or_else(|| {
            self.default_department
                .as_deref()
                .and_then(|fallback| lookup(&self.departments, fallback))
        })
    }
}

/// Explicit role and department keys checked ahead of the identity's own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionOverrides<'a> {
    /// Role key to try first.
    pub role_override: Option<&'a str>,
    /// Department key to try first.
    pub department_override: Option<&'a str>,
}

/// Returns the other spelling of a company page key, if it has one.
#[must_use]
pub fn company_page_alias(page: &str) -> Option<&'static str> {
    COMPANY_PAGE_ALIASES.iter().find_map(|(current, legacy)| {
        if *current == page {
            Some(*legacy)
        } else if *legacy == page {
            Some(*current)
        } else {
            None
        }
    })
}

/// Returns whether the role is one of the owner spellings.
#[must_use]
pub fn is_owner_role(role: &str) -> bool {
    let normalized: String = role
        .trim()
        .chars()
        .map(|character| match character {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect();

    OWNER_ROLES.iter().any(|owner| *owner == normalized)
}

/// Resolves whether an identity may perform `action` on a module page.
///
/// Role and department grants are merged as a union. Missing data denies.
#[must_use]
pub fn resolve(
    identity: &Identity,
    table: &PermissionTable,
    module: &str,
    page: &str,
    action: PermissionAction,
) -> bool {
    resolve_with_overrides(
        identity,
        table,
        module,
        page,
        action,
        PermissionOverrides::default(),
    )
}

/// Same as [`resolve`] with explicit override keys tried first.
#[must_use]
pub fn resolve_with_overrides(
    identity: &Identity,
    table: &PermissionTable,
    module: &str,
    page: &str,
    action: PermissionAction,
    overrides: PermissionOverrides<'_>,
) -> bool {
    if is_owner_role(identity.role()) {
        return true;
    }

    if let Some(role) = overrides.role_override {
        if is_owner_role(role)
            || lookup(&table.roles, role)
                .is_some_and(|permissions| permissions.grants(module, page, action))
        {
            return true;
        }
    }

    if let Some(department) = overrides.department_override {
        if lookup(&table.departments, department)
            .is_some_and(|permissions| permissions.grants(module, page, action))
        {
            return true;
        }
    }

    let role_grant = table
        .role_permissions(identity.role())
        .is_some_and(|permissions| permissions.grants(module, page, action));
    let department_grant = table
        .department_permissions(identity.department())
        .is_some_and(|permissions| permissions.grants(module, page, action));

    role_grant || department_grant
}

/// Lists the module pages the identity can view.
///
/// Company page aliases are folded into their current key. Owners see every
/// page mentioned anywhere in the table for the module.
#[must_use]
pub fn viewable_pages(identity: &Identity, table: &PermissionTable, module: &str) -> BTreeSet<String> {
    let candidates: BTreeSet<&str> = table
        .roles
        .values()
        .chain(table.departments.values())
        .flat_map(|permissions| permissions.page_keys(module))
        .collect();

    candidates
        .into_iter()
        .filter(|page| resolve(identity, table, module, page, PermissionAction::View))
        .map(|page| canonical_page(module, page).to_owned())
        .collect()
}

fn canonical_page<'a>(module: &str, page: &'a str) -> &'a str {
    if module != COMPANY_MODULE {
        return page;
    }

    COMPANY_PAGE_ALIASES
        .iter()
        .find(|(_, legacy)| *legacy == page)
        .map_or(page, |(current, _)| *current)
}

fn lookup<'a>(
    entries: &'a BTreeMap<String, ModulePermissions>,
    key: &str,
) -> Option<&'a ModulePermissions> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    entries.get(key).or_else(|| {
        entries
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, permissions)| permissions)
    })
}
