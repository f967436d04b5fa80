use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scopewise_core::CompanyId;
use scopewise_domain::Site;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

/// Site list returned by one remote fetch, numbered by when the fetch started.
#[derive(Debug, Clone)]
pub(super) struct FetchedSites {
    pub(super) ticket: u64,
    pub(super) sites: Arc<Vec<Site>>,
}

/// Shared outcome of one remote site fetch.
pub(super) type FetchOutcome = Result<FetchedSites, String>;

/// Per-company registry of the remote fetch currently running.
///
/// Callers joining while a fetch runs await the same cell instead of issuing
/// a second request.
#[derive(Default)]
pub(super) struct InFlightFetches {
    entries: Mutex<HashMap<CompanyId, Arc<OnceCell<FetchOutcome>>>>,
}

impl InFlightFetches {
    pub(super) async fn join_or_start(&self, company_id: &CompanyId) -> Arc<OnceCell<FetchOutcome>> {
        Arc::clone(
            self.entries
                .lock()
                .await
                .entry(company_id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    pub(super) async fn release(&self, company_id: &CompanyId, cell: &Arc<OnceCell<FetchOutcome>>) {
        let mut entries = self.entries.lock().await;
        if entries
            .get(company_id)
            .is_some_and(|current| Arc::ptr_eq(current, cell))
        {
            entries.remove(company_id);
        }
    }
}

/// Issued and applied fetch numbers of one company.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Tickets {
    issued: u64,
    applied: u64,
}

/// Per-company numbering of remote site fetches.
///
/// A fetch result is applied only when no later-started fetch has been
/// applied already, so a slow fetch cannot overwrite a newer list.
#[derive(Default)]
pub(super) struct FetchSequence {
    entries: Mutex<HashMap<CompanyId, Tickets>>,
}

impl FetchSequence {
    /// Numbers a fetch that is about to start.
    pub(super) async fn issue(&self, company_id: &CompanyId) -> u64 {
        let mut entries = self.entries.lock().await;
        let tickets = entries.entry(company_id.clone()).or_default();
        tickets.issued += 1;
        tickets.issued
    }

    /// Marks `ticket` as applied unless a later one already was.
    ///
    /// The returned guard blocks other claims until it is dropped.
    pub(super) async fn claim(
        &self,
        company_id: &CompanyId,
        ticket: u64,
    ) -> Option<MutexGuard<'_, HashMap<CompanyId, Tickets>>> {
        let mut entries = self.entries.lock().await;
        let tickets = entries.entry(company_id.clone()).or_default();
        if ticket <= tickets.applied {
            return None;
        }

        tickets.applied = ticket;
        Some(entries)
    }
}

/// Companies with a hydration pass that has not settled yet.
#[derive(Default)]
pub(super) struct ActiveHydrations {
    companies: Mutex<HashSet<CompanyId>>,
}

impl ActiveHydrations {
    /// Marks a company as hydrating; returns `false` if it already was.
    pub(super) async fn begin(&self, company_id: &CompanyId) -> bool {
        self.companies.lock().await.insert(company_id.clone())
    }

    pub(super) async fn finish(&self, company_id: &CompanyId) {
        self.companies.lock().await.remove(company_id);
    }

    pub(super) async fn contains(&self, company_id: &CompanyId) -> bool {
        self.companies.lock().await.contains(company_id)
    }
}
