use std::sync::Arc;

use scopewise_core::{AppResult, CompanyId};
use scopewise_domain::Selection;

use crate::SessionStore;

const COMPANY_ID_KEY: &str = "companyID";
const SITE_ID_KEY: &str = "siteID";
const SITE_NAME_KEY: &str = "siteName";
const SUBSITE_ID_KEY: &str = "subsiteID";
const SUBSITE_NAME_KEY: &str = "subsiteName";

/// Selection persisted by a previous run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Persisted company id.
    pub company_id: Option<String>,
    /// Persisted site.
    pub site: Option<Selection>,
    /// Persisted subsite.
    pub subsite: Option<Selection>,
}

impl SessionSnapshot {
    /// Returns whether the snapshot belongs to the given company.
    #[must_use]
    pub fn belongs_to(&self, company_id: &CompanyId) -> bool {
        self.company_id.as_deref() == Some(company_id.as_str())
    }
}

/// Typed access to the persisted selection keys.
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn SessionStore>,
}

impl SessionPersistence {
    /// Creates a persistence helper over a session store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Reads the persisted selection.
    pub async fn load(&self) -> AppResult<SessionSnapshot> {
        let company_id = self.read(COMPANY_ID_KEY).await?;
        let site = self.read_selection(SITE_ID_KEY, SITE_NAME_KEY).await?;
        let subsite = match site {
            Some(_) => self.read_selection(SUBSITE_ID_KEY, SUBSITE_NAME_KEY).await?,
            None => None,
        };

        Ok(SessionSnapshot {
            company_id,
            site,
            subsite,
        })
    }

    /// Persists the company and drops any lower selection when it changed.
    pub async fn save_company(&self, company_id: &CompanyId) -> AppResult<()> {
        let previous = self.read(COMPANY_ID_KEY).await?;
        if previous.as_deref() != Some(company_id.as_str()) {
            self.save_site(None).await?;
        }

        self.store.set(COMPANY_ID_KEY, company_id.as_str()).await
    }

    /// Persists the site selection and drops the subsite.
    pub async fn save_site(&self, site: Option<&Selection>) -> AppResult<()> {
        self.write_selection(SITE_ID_KEY, SITE_NAME_KEY, site).await?;
        self.save_subsite(None).await
    }

    /// Persists the subsite selection.
    pub async fn save_subsite(&self, subsite: Option<&Selection>) -> AppResult<()> {
        self.write_selection(SUBSITE_ID_KEY, SUBSITE_NAME_KEY, subsite)
            .await
    }

    /// Removes every persisted key.
    pub async fn clear(&self) -> AppResult<()> {
        self.save_site(None).await?;
        self.store.remove(COMPANY_ID_KEY).await
    }

    async fn read(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .store
            .get(key)
            .await?
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty()))
    }

    async fn read_selection(&self, id_key: &str, name_key: &str) -> AppResult<Option<Selection>> {
        let Some(id) = self.read(id_key).await? else {
            return Ok(None);
        };
        let name = self.read(name_key).await?.unwrap_or_default();

        Ok(Some(Selection::new(id, name)))
    }

    async fn write_selection(
        &self,
        id_key: &str,
        name_key: &str,
        selection: Option<&Selection>,
    ) -> AppResult<()> {
        match selection {
            Some(selection) => {
                self.store.set(id_key, selection.id.as_str()).await?;
                self.store.set(name_key, selection.name.as_str()).await
            }
            None => {
                self.store.remove(id_key).await?;
                self.store.remove(name_key).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scopewise_core::CompanyId;
    use scopewise_domain::Selection;

    use super::SessionPersistence;
    use crate::test_fakes::FakeSessionStore;

    #[tokio::test]
    async fn company_switch_drops_persisted_site() {
        let store = Arc::new(FakeSessionStore::default());
        let persistence = SessionPersistence::new(store.clone());
        let acme = CompanyId::new("acme").unwrap_or_else(|_| unreachable!());
        let globex = CompanyId::new("globex").unwrap_or_else(|_| unreachable!());

        assert!(persistence.save_company(&acme).await.is_ok());
        assert!(
            persistence
                .save_site(Some(&Selection::new("s1", "Main")))
                .await
                .is_ok()
        );
        assert!(
            persistence
                .save_subsite(Some(&Selection::new("b1", "Bar")))
                .await
                .is_ok()
        );

        let snapshot = persistence.load().await.unwrap_or_default();
        assert!(snapshot.belongs_to(&acme));
        assert_eq!(snapshot.subsite, Some(Selection::new("b1", "Bar")));

        assert!(persistence.save_company(&globex).await.is_ok());
        let snapshot = persistence.load().await.unwrap_or_default();
        assert_eq!(snapshot.company_id.as_deref(), Some("globex"));
        assert!(snapshot.site.is_none());
        assert!(store.value("subsiteID").await.is_none());
    }

    #[tokio::test]
    async fn subsite_is_ignored_without_site() {
        let store = Arc::new(FakeSessionStore::default());
        store.insert("companyID", "acme").await;
        store.insert("subsiteID", "b1").await;

        let snapshot = SessionPersistence::new(store)
            .load()
            .await
            .unwrap_or_default();
        assert!(snapshot.site.is_none());
        assert!(snapshot.subsite.is_none());
    }
}
