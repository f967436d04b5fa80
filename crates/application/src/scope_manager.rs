//! Single-writer owner of the selected scope.
//!
//! Every transition is sent as a [`ScopeCommand`] to one task that applies
//! them in arrival order. Readers take snapshots through the shared
//! `RwLock`, writers never contend with each other.
//!
//! ```text
//! ContextService ──┐
//!                  ├──► mpsc::Sender<ScopeCommand> ──► ScopeManager::run
//! Hydration task ──┘                                        │
//!                                                           ▼
//!                                            Arc<RwLock<ScopeState>>
//! ```

mod command;

use std::sync::Arc;

use scopewise_core::{AppError, AppResult, CompanyId};
use scopewise_domain::{
    DataManagementConfig, ScopeState, Selection, SelectionOutcome, Site, find_site,
};
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, info};

pub use command::ScopeCommand;

/// Command queue depth before senders wait.
const COMMAND_BUFFER_SIZE: usize = 64;

/// Owns the scope state and applies queued transitions.
pub struct ScopeManager {
    state: Arc<RwLock<ScopeState>>,
    command_rx: mpsc::Receiver<ScopeCommand>,
}

impl ScopeManager {
    /// Creates a manager over an empty scope and the handle that feeds it.
    #[must_use]
    pub fn new() -> (Self, ScopeHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let state = Arc::new(RwLock::new(ScopeState::new()));
        let handle = ScopeHandle {
            command_tx,
            state: Arc::clone(&state),
        };

        (Self { state, command_rx }, handle)
    }

    /// Creates a manager and runs it on the current tokio runtime.
    #[must_use]
    pub fn spawn() -> ScopeHandle {
        let (manager, handle) = Self::new();
        tokio::spawn(manager.run());
        handle
    }

    /// Applies commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        debug!("scope manager started");

        while let Some(command) = self.command_rx.recv().await {
            if matches!(command, ScopeCommand::Shutdown) {
                break;
            }
            let mut state = self.state.write().await;
            apply_command(&mut state, command);
        }

        debug!("scope manager stopped");
    }
}

fn apply_command(state: &mut ScopeState, command: ScopeCommand) {
    match command {
        ScopeCommand::SetTenant { company_id, reply } => {
            let needs_hydration = state.set_tenant(company_id);
            let _ = reply.send(needs_hydration);
        }
        ScopeCommand::SelectSite {
            site_id,
            name,
            reply,
        } => {
            let _ = reply.send(state.select_site(site_id.as_str(), name.as_str()));
        }
        ScopeCommand::SelectSubsite {
            subsite_id,
            name,
            reply,
        } => {
            let _ = reply.send(state.select_subsite(subsite_id.as_str(), name.as_str()));
        }
        ScopeCommand::SelectTeam {
            team_id,
            name,
            reply,
        } => {
            let _ = reply.send(state.select_team(team_id.as_str(), name.as_str()));
        }
        ScopeCommand::SeedSelection {
            company_id,
            site,
            subsite,
            reply,
        } => {
            let result = if state.is_active_company(&company_id) {
                state.restore_selection(site, subsite)
            } else {
                Err(AppError::InvalidInput(format!(
                    "company '{company_id}' is not the active company"
                )))
            };
            let _ = reply.send(result);
        }
        ScopeCommand::RestoreSelection {
            company_id,
            site,
            subsite,
            reply,
        } => {
            let _ = reply.send(restore_if_present(state, &company_id, site, subsite));
        }
        ScopeCommand::ReplaceSites {
            company_id,
            sites,
            reply,
        } => {
            let applied = state.is_active_company(&company_id);
            if applied {
                state.set_sites(sites);
            } else {
                debug!(company_id = %company_id, "discarding site list for inactive company");
            }
            let _ = reply.send(applied);
        }
        ScopeCommand::ApplyTenantConfig { company_id, config } => {
            if state.is_active_company(&company_id) {
                state.apply_tenant_config(config);
            }
        }
        ScopeCommand::ApplySubsiteOverride {
            company_id,
            site_id,
            subsite_id,
            config,
            reply,
        } => {
            let still_selected = state.is_active_company(&company_id)
                && state.site().is_some_and(|site| site.id == site_id)
                && state
                    .subsite()
                    .is_some_and(|subsite| subsite.id == subsite_id);
            if still_selected {
                state.apply_subsite_override(config);
            }
            let _ = reply.send(still_selected);
        }
        ScopeCommand::ClearSelection { reply } => {
            state.clear_selection();
            let _ = reply.send(());
        }
        ScopeCommand::Reset { reply } => {
            state.reset();
            let _ = reply.send(());
        }
        ScopeCommand::Shutdown => {}
    }
}

fn restore_if_present(
    state: &mut ScopeState,
    company_id: &CompanyId,
    site: Selection,
    subsite: Option<Selection>,
) -> bool {
    if !state.is_active_company(company_id) || state.site().is_some() {
        return false;
    }

    let Some(site_document) = find_site(state.sites(), site.id.as_str()) else {
        return false;
    };
    let subsite = subsite.filter(|selection| site_document.find_subsite(&selection.id).is_some());

    let restored = state.restore_selection(site, subsite).is_ok();
    if restored {
        info!(company_id = %company_id, "restored persisted site selection");
    }
    restored
}

/// Cloneable sender side of the scope manager.
#[derive(Clone)]
pub struct ScopeHandle {
    command_tx: mpsc::Sender<ScopeCommand>,
    state: Arc<RwLock<ScopeState>>,
}

impl ScopeHandle {
    /// Returns a copy of the current scope.
    pub async fn snapshot(&self) -> ScopeState {
        self.state.read().await.clone()
    }

    /// Returns the active company, if any.
    pub async fn active_company(&self) -> Option<CompanyId> {
        self.state.read().await.company_id().cloned()
    }

    /// Selects a company; returns whether its sites still need hydration.
    pub async fn set_tenant(&self, company_id: CompanyId) -> AppResult<bool> {
        self.request(|reply| ScopeCommand::SetTenant { company_id, reply })
            .await
    }

    /// Selects a site.
    pub async fn select_site(&self, site_id: &str, name: &str) -> AppResult<SelectionOutcome> {
        self.request(|reply| ScopeCommand::SelectSite {
            site_id: site_id.to_owned(),
            name: name.to_owned(),
            reply,
        })
        .await?
    }

    /// Selects a subsite.
    pub async fn select_subsite(
        &self,
        subsite_id: &str,
        name: &str,
    ) -> AppResult<SelectionOutcome> {
        self.request(|reply| ScopeCommand::SelectSubsite {
            subsite_id: subsite_id.to_owned(),
            name: name.to_owned(),
            reply,
        })
        .await?
    }

    /// Selects a team.
    pub async fn select_team(&self, team_id: &str, name: &str) -> AppResult<()> {
        self.request(|reply| ScopeCommand::SelectTeam {
            team_id: team_id.to_owned(),
            name: name.to_owned(),
            reply,
        })
        .await?
    }

    /// Seeds a persisted selection before any site data is available.
    pub async fn seed_selection(
        &self,
        company_id: CompanyId,
        site: Selection,
        subsite: Option<Selection>,
    ) -> AppResult<()> {
        self.request(|reply| ScopeCommand::SeedSelection {
            company_id,
            site,
            subsite,
            reply,
        })
        .await?
    }

    /// Restores a persisted selection when it still exists and nothing is selected.
    pub async fn restore_selection(
        &self,
        company_id: CompanyId,
        site: Selection,
        subsite: Option<Selection>,
    ) -> AppResult<bool> {
        self.request(|reply| ScopeCommand::RestoreSelection {
            company_id,
            site,
            subsite,
            reply,
        })
        .await
    }

    /// Replaces the site list; returns `false` when the company is no longer active.
    pub async fn replace_sites(&self, company_id: CompanyId, sites: Vec<Site>) -> AppResult<bool> {
        self.request(|reply| ScopeCommand::ReplaceSites {
            company_id,
            sites,
            reply,
        })
        .await
    }

    /// Stores the company-wide storage configuration.
    pub async fn apply_tenant_config(
        &self,
        company_id: CompanyId,
        config: DataManagementConfig,
    ) -> AppResult<()> {
        self.send(ScopeCommand::ApplyTenantConfig { company_id, config })
            .await
    }

    /// Stores a subsite override; returns `false` when the subsite is no longer selected.
    pub async fn apply_subsite_override(
        &self,
        company_id: CompanyId,
        site_id: String,
        subsite_id: String,
        config: DataManagementConfig,
    ) -> AppResult<bool> {
        self.request(|reply| ScopeCommand::ApplySubsiteOverride {
            company_id,
            site_id,
            subsite_id,
            config,
            reply,
        })
        .await
    }

    /// Resets site, subsite and team.
    pub async fn clear_selection(&self) -> AppResult<()> {
        self.request(|reply| ScopeCommand::ClearSelection { reply })
            .await
    }

    /// Returns to the empty initial scope.
    pub async fn reset(&self) -> AppResult<()> {
        self.request(|reply| ScopeCommand::Reset { reply }).await
    }

    /// Stops the manager task.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.send(ScopeCommand::Shutdown).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ScopeCommand,
    ) -> AppResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(build(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| AppError::Internal("scope manager dropped the reply".to_owned()))
    }

    async fn send(&self, command: ScopeCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AppError::Internal("scope manager is not running".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use scopewise_domain::{DataManagementConfig, Selection, SelectionOutcome, Site, SubsiteRecord};

    use super::ScopeManager;
    use crate::test_fakes::company;

    fn sites() -> Vec<Site> {
        vec![
            Site::new("s1", "Main")
                .with_subsite("b1", SubsiteRecord::new("b1", "Bar"))
                .with_subsite("b2", SubsiteRecord::new("b2", "Terrace")),
        ]
    }

    #[tokio::test]
    async fn transitions_are_applied_in_order() {
        let handle = ScopeManager::spawn();
        let acme = company("acme");

        assert!(matches!(handle.set_tenant(acme.clone()).await, Ok(true)));
        assert!(matches!(
            handle.replace_sites(acme.clone(), sites()).await,
            Ok(true)
        ));
        assert!(matches!(
            handle.select_site("s1", "Main").await,
            Ok(SelectionOutcome::Applied)
        ));
        assert!(matches!(
            handle.select_subsite("b2", "Terrace").await,
            Ok(SelectionOutcome::Applied)
        ));
        assert!(handle.select_team("t1", "Closers").await.is_ok());

        let scope = handle.snapshot().await;
        assert_eq!(scope.subsite().map(|s| s.id.as_str()), Some("b2"));
        assert_eq!(scope.team().map(|t| t.id.as_str()), Some("t1"));
        assert!(matches!(handle.set_tenant(acme).await, Ok(false)));
    }

    #[tokio::test]
    async fn stale_site_list_is_discarded_after_tenant_switch() {
        let handle = ScopeManager::spawn();
        assert!(handle.set_tenant(company("acme")).await.is_ok());
        assert!(handle.set_tenant(company("globex")).await.is_ok());

        let applied = handle.replace_sites(company("acme"), sites()).await;
        assert!(matches!(applied, Ok(false)));
        assert!(handle.snapshot().await.sites().is_empty());
    }

    #[tokio::test]
    async fn override_for_deselected_subsite_is_dropped() {
        let handle = ScopeManager::spawn();
        let acme = company("acme");
        assert!(handle.set_tenant(acme.clone()).await.is_ok());
        assert!(handle.replace_sites(acme.clone(), sites()).await.is_ok());
        assert!(handle.select_site("s1", "Main").await.is_ok());
        assert!(handle.select_subsite("b1", "Bar").await.is_ok());
        assert!(handle.select_subsite("b2", "Terrace").await.is_ok());

        let applied = handle
            .apply_subsite_override(
                acme,
                "s1".to_owned(),
                "b1".to_owned(),
                DataManagementConfig::new(),
            )
            .await;
        assert!(matches!(applied, Ok(false)));
    }

    #[tokio::test]
    async fn restore_requires_existing_ids_and_empty_selection() {
        let handle = ScopeManager::spawn();
        let acme = company("acme");
        assert!(handle.set_tenant(acme.clone()).await.is_ok());
        assert!(handle.replace_sites(acme.clone(), sites()).await.is_ok());

        let missing = handle
            .restore_selection(acme.clone(), Selection::new("gone", "Gone"), None)
            .await;
        assert!(matches!(missing, Ok(false)));

        let restored = handle
            .restore_selection(
                acme.clone(),
                Selection::new("s1", "Main"),
                Some(Selection::new("b404", "Missing")),
            )
            .await;
        assert!(matches!(restored, Ok(true)));
        let scope = handle.snapshot().await;
        assert_eq!(scope.site().map(|s| s.id.as_str()), Some("s1"));
        assert!(scope.subsite().is_none());

        let again = handle
            .restore_selection(acme, Selection::new("s1", "Main"), None)
            .await;
        assert!(matches!(again, Ok(false)));
    }

    #[tokio::test]
    async fn handle_reports_stopped_manager() {
        let handle = ScopeManager::spawn();
        assert!(handle.shutdown().await.is_ok());

        let mut stopped = false;
        for _ in 0..50 {
            if handle.set_tenant(company("acme")).await.is_err() {
                stopped = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(stopped);
    }
}
