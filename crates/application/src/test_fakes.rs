use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scopewise_core::{AppError, AppResult, CompanyId};
use scopewise_domain::{DataManagementConfig, PermissionTable, Site, Tenant};
use tokio::sync::{Mutex, Notify};

use crate::{
    PermissionTableRepository, RemoteStore, SaveSiteInput, SaveSubsiteInput, SessionStore,
    SiteCache,
};

pub(crate) fn company(value: &str) -> CompanyId {
    CompanyId::new(value).unwrap_or_else(|_| unreachable!("valid test company id"))
}

/// Polls `condition` until it holds or roughly a second has passed.
pub(crate) async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    false
}

#[derive(Default)]
pub(crate) struct FakeRemoteStore {
    pub(crate) sites: Mutex<HashMap<CompanyId, Vec<Site>>>,
    pub(crate) tenants: Mutex<HashMap<CompanyId, Tenant>>,
    pub(crate) subsite_configs: Mutex<HashMap<String, DataManagementConfig>>,
    pub(crate) failing: Mutex<bool>,
    pub(crate) failing_subsite_config: Mutex<bool>,
    pub(crate) gate: Mutex<Option<Arc<Notify>>>,
    /// Delays for the next site fetches. A delayed fetch answers with the
    /// sites as they were when it started.
    pub(crate) slow_fetches: Mutex<VecDeque<Duration>>,
    pub(crate) fetch_count: AtomicUsize,
    pub(crate) subsite_config_gate: Mutex<Option<Arc<Notify>>>,
    pub(crate) subsite_config_requests: AtomicUsize,
    pub(crate) mutations: Mutex<VecDeque<String>>,
}

impl FakeRemoteStore {
    pub(crate) async fn with_sites(company_id: &CompanyId, sites: Vec<Site>) -> Self {
        let store = Self::default();
        store.sites.lock().await.insert(company_id.clone(), sites);
        store
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Blocks every following site fetch until the returned notifier fires.
    pub(crate) async fn hold_fetches(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().await = Some(notify.clone());
        notify
    }

    /// Blocks every following subsite config fetch until the returned notifier fires.
    pub(crate) async fn hold_subsite_configs(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.subsite_config_gate.lock().await = Some(notify.clone());
        notify
    }

    pub(crate) fn subsite_config_fetches(&self) -> usize {
        self.subsite_config_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for FakeRemoteStore {
    async fn fetch_sites(&self, company_id: &CompanyId) -> AppResult<Vec<Site>> {
        let delay = self.slow_fetches.lock().await.pop_front();
        if let Some(delay) = delay {
            let sites = self.sites.lock().await.get(company_id).cloned();
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            return Ok(sites.unwrap_or_default());
        }

        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().await.clone();
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::time::sleep(Duration::from_millis(10)).await,
        }

        if *self.failing.lock().await {
            return Err(AppError::Internal("remote store unavailable".to_owned()));
        }

        Ok(self
            .sites
            .lock()
            .await
            .get(company_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_tenant(&self, company_id: &CompanyId) -> AppResult<Option<Tenant>> {
        Ok(self.tenants.lock().await.get(company_id).cloned())
    }

    async fn fetch_subsite_config(
        &self,
        _company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
    ) -> AppResult<Option<DataManagementConfig>> {
        self.subsite_config_requests.fetch_add(1, Ordering::SeqCst);
        let gate = self.subsite_config_gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if *self.failing_subsite_config.lock().await {
            return Err(AppError::Internal("config document unreadable".to_owned()));
        }

        Ok(self
            .subsite_configs
            .lock()
            .await
            .get(&format!("{site_id}/{subsite_id}"))
            .cloned())
    }

    async fn create_site(
        &self,
        company_id: &CompanyId,
        input: SaveSiteInput,
    ) -> AppResult<String> {
        let site_id = format!("site-{}", input.name.to_lowercase());
        self.sites
            .lock()
            .await
            .entry(company_id.clone())
            .or_default()
            .push(Site::new(site_id.clone(), input.name));
        self.mutations
            .lock()
            .await
            .push_back(format!("create_site:{site_id}"));
        Ok(site_id)
    }

    async fn update_site(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        input: SaveSiteInput,
    ) -> AppResult<()> {
        let mut sites = self.sites.lock().await;
        let site = sites
            .get_mut(company_id)
            .and_then(|sites| sites.iter_mut().find(|site| site.site_id == site_id))
            .ok_or_else(|| AppError::NotFound(format!("site '{site_id}'")))?;
        site.name = input.name;
        site.address = input.address;
        Ok(())
    }

    async fn delete_site(&self, company_id: &CompanyId, site_id: &str) -> AppResult<()> {
        if let Some(sites) = self.sites.lock().await.get_mut(company_id) {
            sites.retain(|site| site.site_id != site_id);
        }
        self.mutations
            .lock()
            .await
            .push_back(format!("delete_site:{site_id}"));
        Ok(())
    }

    async fn create_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        input: SaveSubsiteInput,
    ) -> AppResult<String> {
        let subsite_id = format!("sub-{}", input.name.to_lowercase());
        let mut sites = self.sites.lock().await;
        let site = sites
            .get_mut(company_id)
            .and_then(|sites| sites.iter_mut().find(|site| site.site_id == site_id))
            .ok_or_else(|| AppError::NotFound(format!("site '{site_id}'")))?;
        site.subsites.insert(
            subsite_id.clone(),
            scopewise_domain::SubsiteRecord::new(subsite_id.clone(), input.name),
        );
        Ok(subsite_id)
    }

    async fn update_subsite(
        &self,
        _company_id: &CompanyId,
        _site_id: &str,
        _subsite_id: &str,
        _input: SaveSubsiteInput,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn delete_subsite(
        &self,
        company_id: &CompanyId,
        site_id: &str,
        subsite_id: &str,
    ) -> AppResult<()> {
        if let Some(site) = self
            .sites
            .lock()
            .await
            .get_mut(company_id)
            .and_then(|sites| sites.iter_mut().find(|site| site.site_id == site_id))
        {
            site.subsites.remove(subsite_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeSiteCache {
    pub(crate) entries: Mutex<HashMap<CompanyId, Vec<Site>>>,
    pub(crate) writes: AtomicUsize,
}

impl FakeSiteCache {
    pub(crate) async fn seeded(company_id: &CompanyId, sites: Vec<Site>) -> Self {
        let cache = Self::default();
        cache.entries.lock().await.insert(company_id.clone(), sites);
        cache
    }
}

#[async_trait]
impl SiteCache for FakeSiteCache {
    async fn get(&self, company_id: &CompanyId) -> AppResult<Option<Vec<Site>>> {
        Ok(self.entries.lock().await.get(company_id).cloned())
    }

    async fn put(&self, company_id: &CompanyId, sites: &[Site]) -> AppResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .await
            .insert(company_id.clone(), sites.to_vec());
        Ok(())
    }

    async fn invalidate(&self, company_id: &CompanyId) -> AppResult<()> {
        self.entries.lock().await.remove(company_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeSessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl FakeSessionStore {
    pub(crate) async fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
    }

    pub(crate) async fn value(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for FakeSessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.value(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.insert(key, value).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakePermissionTableRepository {
    pub(crate) tables: Mutex<HashMap<CompanyId, PermissionTable>>,
    pub(crate) failing: Mutex<bool>,
    pub(crate) gate: Mutex<Option<Arc<Notify>>>,
}

#[async_trait]
impl PermissionTableRepository for FakePermissionTableRepository {
    async fn find_permission_table(
        &self,
        company_id: &CompanyId,
    ) -> AppResult<Option<PermissionTable>> {
        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if *self.failing.lock().await {
            return Err(AppError::Internal("permission store unavailable".to_owned()));
        }

        Ok(self.tables.lock().await.get(company_id).cloned())
    }
}
