use scopewise_core::{AppError, AppResult, CompanyId};
use serde::{Deserialize, Serialize};

use crate::{DataManagementConfig, Site, Subsite, find_site};

/// Selected hierarchy node: id plus the display name shown alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Stable id of the selected node.
    pub id: String,
    /// Display name captured at selection time.
    pub name: String,
}

impl Selection {
    /// Creates a selection reference.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How a selection transition was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The id exists in the currently visible list.
    Applied,
    /// The id is not in the visible list yet; selection kept, derived data empty.
    Optimistic,
    /// The id is unknown and the selection was left unchanged.
    NotApplied,
}

/// Currently selected tenant scope and the data visible at each level.
///
/// Invariants: a subsite or team is only ever selected together with a site,
/// and `subsites` is always the repaired subsite list of the selected site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeState {
    company_id: Option<CompanyId>,
    site: Option<Selection>,
    subsite: Option<Selection>,
    team: Option<Selection>,
    sites: Vec<Site>,
    subsites: Vec<Subsite>,
    sites_loaded: bool,
    tenant_config: DataManagementConfig,
    subsite_override: Option<DataManagementConfig>,
}

impl ScopeState {
    /// Creates the empty initial scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selected company.
    #[must_use]
    pub fn company_id(&self) -> Option<&CompanyId> {
        self.company_id.as_ref()
    }

    /// Returns the selected site.
    #[must_use]
    pub fn site(&self) -> Option<&Selection> {
        self.site.as_ref()
    }

    /// Returns the selected subsite.
    #[must_use]
    pub fn subsite(&self) -> Option<&Selection> {
        self.subsite.as_ref()
    }

    /// Returns the selected team.
    #[must_use]
    pub fn team(&self) -> Option<&Selection> {
        self.team.as_ref()
    }

    /// Returns the sites visible for the selected company.
    #[must_use]
    pub fn sites(&self) -> &[Site] {
        self.sites.as_slice()
    }

    /// Returns the subsites of the selected site.
    #[must_use]
    pub fn subsites(&self) -> &[Subsite] {
        self.subsites.as_slice()
    }

    /// Returns whether a site list has been delivered for the selected company.
    #[must_use]
    pub fn sites_loaded(&self) -> bool {
        self.sites_loaded
    }

    /// Returns whether `company_id` is the selected company.
    #[must_use]
    pub fn is_active_company(&self, company_id: &CompanyId) -> bool {
        self.company_id.as_ref() == Some(company_id)
    }

    /// Selects a company.
    ///
    /// Switching companies drops every lower selection and all loaded data.
    /// Returns `true` when the company's sites still need to be hydrated.
    pub fn set_tenant(&mut self, company_id: CompanyId) -> bool {
        if self.is_active_company(&company_id) {
            return !self.sites_loaded;
        }

        *self = Self {
            company_id: Some(company_id),
            ..Self::default()
        };
        true
    }

    /// Selects a site, clearing subsite and team.
    ///
    /// Unknown site ids are accepted optimistically; the subsite list stays
    /// empty until a site list containing the id arrives.
    pub fn select_site(&mut self, site_id: &str, name: &str) -> AppResult<SelectionOutcome> {
        self.require_company()?;
        let site_id = required_id(site_id, "site id")?;

        self.site = Some(Selection::new(site_id, name));
        self.subsite = None;
        self.team = None;
        self.subsite_override = None;
        self.derive_subsites();

        Ok(if self.selected_site_document().is_some() {
            SelectionOutcome::Applied
        } else {
            SelectionOutcome::Optimistic
        })
    }

    /// Selects a subsite of the selected site, clearing the team.
    pub fn select_subsite(&mut self, subsite_id: &str, name: &str) -> AppResult<SelectionOutcome> {
        if self.site.is_none() {
            return Err(AppError::InvalidInput(
                "a site must be selected before a subsite".to_owned(),
            ));
        }
        let subsite_id = required_id(subsite_id, "subsite id")?;

        if !self
            .subsites
            .iter()
            .any(|subsite| subsite.subsite_id == subsite_id)
        {
            return Ok(SelectionOutcome::NotApplied);
        }

        self.subsite = Some(Selection::new(subsite_id, name));
        self.team = None;
        self.subsite_override = None;
        Ok(SelectionOutcome::Applied)
    }

    /// Selects a team under the current site or subsite.
    pub fn select_team(&mut self, team_id: &str, name: &str) -> AppResult<()> {
        if self.site.is_none() {
            return Err(AppError::InvalidInput(
                "a site must be selected before a team".to_owned(),
            ));
        }
        let team_id = required_id(team_id, "team id")?;

        self.team = Some(Selection::new(team_id, name));
        Ok(())
    }

    /// Replaces the visible site list and re-derives the selected site's subsites.
    ///
    /// A selected subsite that is no longer part of the selected site is dropped
    /// together with its team.
    pub fn set_sites(&mut self, sites: Vec<Site>) {
        self.sites = sites;
        self.sites_loaded = true;
        self.derive_subsites();

        let subsite_missing = self.subsite.as_ref().is_some_and(|selected| {
            !self
                .subsites
                .iter()
                .any(|subsite| subsite.subsite_id == selected.id)
        });
        if subsite_missing {
            self.subsite = None;
            self.team = None;
            self.subsite_override = None;
        }
    }

    /// Seeds a site and optional subsite without checking membership.
    ///
    /// Used when restoring a persisted session before any site data exists;
    /// [`ScopeState::set_sites`] repairs the selection once data arrives.
    pub fn restore_selection(
        &mut self,
        site: Selection,
        subsite: Option<Selection>,
    ) -> AppResult<()> {
        self.require_company()?;
        required_id(site.id.as_str(), "site id")?;

        self.site = Some(site);
        self.subsite = subsite.filter(|selection| !selection.id.trim().is_empty());
        self.team = None;
        self.subsite_override = None;
        self.derive_subsites();
        Ok(())
    }

    /// Resets site, subsite and team while keeping the company.
    pub fn clear_selection(&mut self) {
        self.site = None;
        self.subsite = None;
        self.team = None;
        self.subsites.clear();
        self.subsite_override = None;
    }

    /// Returns to the empty initial scope.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Stores the company-wide storage configuration.
    pub fn apply_tenant_config(&mut self, config: DataManagementConfig) {
        self.tenant_config = config;
    }

    /// Stores a fetched subsite-level override for the selected subsite.
    pub fn apply_subsite_override(&mut self, config: DataManagementConfig) {
        if self.subsite.is_some() {
            self.subsite_override = Some(config);
        }
    }

    /// Returns the effective storage configuration for the current selection.
    ///
    /// Layers from least to most specific: company, site, embedded subsite,
    /// fetched subsite override.
    #[must_use]
    pub fn effective_config(&self) -> DataManagementConfig {
        let mut config = self.tenant_config.clone();

        if let Some(site_config) = self
            .selected_site_document()
            .and_then(|site| site.data_management.as_ref())
        {
            config = config.overlay(site_config);
        }

        if let Some(selected) = self.subsite.as_ref() {
            if let Some(embedded) = self
                .subsites
                .iter()
                .find(|subsite| subsite.subsite_id == selected.id)
                .and_then(|subsite| subsite.data_management.as_ref())
            {
                config = config.overlay(embedded);
            }
        }

        if let Some(fetched) = self.subsite_override.as_ref() {
            config = config.overlay(fetched);
        }

        config
    }

    fn selected_site_document(&self) -> Option<&Site> {
        self.site
            .as_ref()
            .and_then(|selected| find_site(&self.sites, selected.id.as_str()))
    }

    fn derive_subsites(&mut self) {
        self.subsites = self
            .selected_site_document()
            .map(Site::subsite_list)
            .unwrap_or_default();
    }

    fn require_company(&self) -> AppResult<()> {
        if self.company_id.is_none() {
            return Err(AppError::InvalidInput("no company selected".to_owned()));
        }

        Ok(())
    }
}

fn required_id(value: &str, label: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{label} must not be empty")));
    }

    Ok(trimmed.to_owned())
}
