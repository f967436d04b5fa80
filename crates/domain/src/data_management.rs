use std::collections::BTreeMap;
use std::str::FromStr;

use scopewise_core::{AppError, CompanyId};
use serde::{Deserialize, Serialize};

/// Hierarchy level a module stores its data at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Shared across the whole company.
    Company,
    /// Partitioned per site.
    Site,
    /// Partitioned per subsite.
    Subsite,
}

impl StorageScope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Site => "site",
            Self::Subsite => "subsite",
        }
    }
}

impl FromStr for StorageScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "company" => Ok(Self::Company),
            "site" => Ok(Self::Site),
            "subsite" => Ok(Self::Subsite),
            _ => Err(AppError::InvalidInput(format!(
                "unknown storage scope '{value}'"
            ))),
        }
    }
}

/// Per-module storage scope configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataManagementConfig {
    modules: BTreeMap<String, StorageScope>,
}

impl DataManagementConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configuration with one module scope set.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>, scope: StorageScope) -> Self {
        self.modules.insert(module.into(), scope);
        self
    }

    /// Returns the configured scope for a module.
    #[must_use]
    pub fn scope_for(&self, module: &str) -> Option<StorageScope> {
        self.modules.get(module).copied()
    }

    /// Iterates configured modules in key order.
    pub fn modules(&self) -> impl Iterator<Item = (&str, StorageScope)> {
        self.modules
            .iter()
            .map(|(module, scope)| (module.as_str(), *scope))
    }

    /// Returns whether no module is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns a copy where every module set in `other` replaces this one's value.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        let mut modules = self.modules.clone();
        modules.extend(other.modules.iter().map(|(key, scope)| (key.clone(), *scope)));
        Self { modules }
    }
}

/// Tenant root document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable company id.
    #[serde(rename = "companyID")]
    pub company_id: CompanyId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Company-wide storage scope configuration.
    #[serde(rename = "dataManagementConfig", default)]
    pub data_management: DataManagementConfig,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{DataManagementConfig, StorageScope};

    #[test]
    fn overlay_prefers_override_values() {
        let base = DataManagementConfig::new()
            .with_module("stock", StorageScope::Company)
            .with_module("hr", StorageScope::Site);
        let override_config = DataManagementConfig::new().with_module("stock", StorageScope::Subsite);

        let merged = base.overlay(&override_config);
        assert_eq!(merged.scope_for("stock"), Some(StorageScope::Subsite));
        assert_eq!(merged.scope_for("hr"), Some(StorageScope::Site));
        assert_eq!(merged.scope_for("pos"), None);
    }

    #[test]
    fn storage_scope_parses_case_insensitively() {
        assert_eq!(StorageScope::from_str("Site").ok(), Some(StorageScope::Site));
        assert!(StorageScope::from_str("region").is_err());
    }
}
