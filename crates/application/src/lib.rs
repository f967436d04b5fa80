//! Application services and ports.

#![forbid(unsafe_code)]

mod context_ports;
mod context_service;
mod hydration_service;
mod permission_service;
mod scope_manager;
mod session_persistence;

#[cfg(test)]
mod test_fakes;

pub use context_ports::{
    PermissionTableRepository, RemoteStore, SaveSiteInput, SaveSubsiteInput, SessionStore,
    SiteCache,
};
pub use context_service::ContextService;
pub use hydration_service::{HydrationOutcome, HydrationService};
pub use permission_service::{AccessRequest, PermissionPolicy, PermissionService};
pub use scope_manager::{ScopeCommand, ScopeHandle, ScopeManager};
pub use session_persistence::{SessionPersistence, SessionSnapshot};
