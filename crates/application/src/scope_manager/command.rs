use scopewise_core::{AppResult, CompanyId};
use scopewise_domain::{DataManagementConfig, Selection, SelectionOutcome, Site};
use tokio::sync::oneshot;

/// Transitions applied to the scope by its owning task.
///
/// Commands produced by asynchronous continuations carry the company (and
/// site/subsite) they were issued for, and are dropped when that is no longer
/// the active selection.
#[derive(Debug)]
pub enum ScopeCommand {
    /// Select a company; replies whether its sites still need hydration.
    SetTenant {
        /// Company to activate.
        company_id: CompanyId,
        /// Reply channel.
        reply: oneshot::Sender<bool>,
    },

    /// Select a site.
    SelectSite {
        /// Site id.
        site_id: String,
        /// Display name.
        name: String,
        /// Reply channel.
        reply: oneshot::Sender<AppResult<SelectionOutcome>>,
    },

    /// Select a subsite of the selected site.
    SelectSubsite {
        /// Subsite id.
        subsite_id: String,
        /// Display name.
        name: String,
        /// Reply channel.
        reply: oneshot::Sender<AppResult<SelectionOutcome>>,
    },

    /// Select a team.
    SelectTeam {
        /// Team id.
        team_id: String,
        /// Display name.
        name: String,
        /// Reply channel.
        reply: oneshot::Sender<AppResult<()>>,
    },

    /// Seed a persisted selection without membership checks.
    SeedSelection {
        /// Company the selection belongs to.
        company_id: CompanyId,
        /// Persisted site.
        site: Selection,
        /// Persisted subsite.
        subsite: Option<Selection>,
        /// Reply channel.
        reply: oneshot::Sender<AppResult<()>>,
    },

    /// Restore a persisted selection if it still exists in the loaded sites.
    RestoreSelection {
        /// Company the selection belongs to.
        company_id: CompanyId,
        /// Persisted site.
        site: Selection,
        /// Persisted subsite.
        subsite: Option<Selection>,
        /// Replies whether anything was restored.
        reply: oneshot::Sender<bool>,
    },

    /// Replace the site list of a company.
    ReplaceSites {
        /// Company the list was fetched for.
        company_id: CompanyId,
        /// Fresh site list.
        sites: Vec<Site>,
        /// Replies whether the list was applied.
        reply: oneshot::Sender<bool>,
    },

    /// Store the company-wide storage configuration.
    ApplyTenantConfig {
        /// Company the config was fetched for.
        company_id: CompanyId,
        /// Fetched configuration.
        config: DataManagementConfig,
    },

    /// Store a fetched subsite override.
    ApplySubsiteOverride {
        /// Company the override was fetched for.
        company_id: CompanyId,
        /// Site the override was fetched for.
        site_id: String,
        /// Subsite the override was fetched for.
        subsite_id: String,
        /// Fetched configuration.
        config: DataManagementConfig,
        /// Replies whether the override was applied.
        reply: oneshot::Sender<bool>,
    },

    /// Reset site, subsite and team.
    ClearSelection {
        /// Reply channel.
        reply: oneshot::Sender<()>,
    },

    /// Return to the empty initial scope.
    Reset {
        /// Reply channel.
        reply: oneshot::Sender<()>,
    },

    /// Stop the owning task.
    Shutdown,
}
