use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::DataManagementConfig;

/// Team attached to a site or a subsite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Stable team id.
    #[serde(rename = "teamID", default)]
    pub team_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Member user ids.
    #[serde(default)]
    pub members: Vec<String>,
}

impl Team {
    /// Creates a team without members.
    #[must_use]
    pub fn new(team_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            name: name.into(),
            members: Vec::new(),
        }
    }
}

/// Subsite exactly as embedded in a site document.
///
/// The stored id may disagree with the map key it lives under, or be missing
/// entirely. Read through [`normalize_subsites`] instead of trusting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsiteRecord {
    /// Explicit subsite id stored on the value.
    #[serde(rename = "subsiteID", default, skip_serializing_if = "Option::is_none")]
    pub subsite_id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form location label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Teams owned by the subsite.
    #[serde(default)]
    pub teams: BTreeMap<String, Team>,
    /// Embedded storage-scope override.
    #[serde(
        rename = "dataManagementConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_management: Option<DataManagementConfig>,
}

impl SubsiteRecord {
    /// Creates a record carrying an explicit id and name.
    #[must_use]
    pub fn new(subsite_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subsite_id: Some(subsite_id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Subsite after key/value repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsite {
    /// Repaired subsite id.
    #[serde(rename = "subsiteID")]
    pub subsite_id: String,
    /// Display name, empty when the record had none.
    pub name: String,
    /// Free-form location label.
    pub location: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Teams owned by the subsite.
    pub teams: BTreeMap<String, Team>,
    /// Embedded storage-scope override.
    #[serde(rename = "dataManagementConfig")]
    pub data_management: Option<DataManagementConfig>,
}

/// Site document with its embedded subsites and teams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Stable site id.
    #[serde(rename = "siteID")]
    pub site_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Embedded subsites keyed by their storage key.
    #[serde(default)]
    pub subsites: BTreeMap<String, SubsiteRecord>,
    /// Teams owned directly by the site.
    #[serde(default)]
    pub teams: BTreeMap<String, Team>,
    /// Embedded storage-scope override.
    #[serde(
        rename = "dataManagementConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_management: Option<DataManagementConfig>,
}

impl Site {
    /// Creates a site without subsites or teams.
    #[must_use]
    pub fn new(site_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an embedded subsite under the given storage key.
    #[must_use]
    pub fn with_subsite(mut self, key: impl Into<String>, record: SubsiteRecord) -> Self {
        self.subsites.insert(key.into(), record);
        self
    }

    /// Adds a site-level team.
    #[must_use]
    pub fn with_team(mut self, team: Team) -> Self {
        self.teams.insert(team.team_id.clone(), team);
        self
    }

    /// Returns whether the document carries any embedded subsite data.
    #[must_use]
    pub fn has_subsite_data(&self) -> bool {
        !self.subsites.is_empty()
    }

    /// Returns the repaired subsite list.
    #[must_use]
    pub fn subsite_list(&self) -> Vec<Subsite> {
        normalize_subsites(&self.subsites)
    }

    /// Finds a subsite by its repaired id.
    #[must_use]
    pub fn find_subsite(&self, subsite_id: &str) -> Option<Subsite> {
        self.subsite_list()
            .into_iter()
            .find(|subsite| subsite.subsite_id == subsite_id)
    }
}

/// Finds a site by id in a site list.
#[must_use]
pub fn find_site<'a>(sites: &'a [Site], site_id: &str) -> Option<&'a Site> {
    sites.iter().find(|site| site.site_id == site_id)
}

/// Returns whether a cached site list is trustworthy enough to display.
///
/// Entries written by older schema versions never carried subsite data, so a
/// list without any subsites is treated as stale.
#[must_use]
pub fn has_usable_subsite_data(sites: &[Site]) -> bool {
    sites.iter().any(Site::has_subsite_data)
}

/// Repairs an embedded subsite map into a subsite list.
///
/// The explicit `subsiteID` wins over the map key; the key is used only when
/// the explicit id is missing or blank. Entries left with neither an id nor a
/// name are dropped.
#[must_use]
pub fn normalize_subsites(records: &BTreeMap<String, SubsiteRecord>) -> Vec<Subsite> {
    records
        .iter()
        .filter_map(|(key, record)| {
            let subsite_id = non_blank(record.subsite_id.as_deref())
                .or_else(|| non_blank(Some(key.as_str())))
                .unwrap_or_default();
            let name = non_blank(record.name.as_deref()).unwrap_or_default();

            if subsite_id.is_empty() && name.is_empty() {
                return None;
            }

            Some(Subsite {
                subsite_id,
                name,
                location: record.location.clone(),
                address: record.address.clone(),
                teams: record.teams.clone(),
                data_management: record.data_management.clone(),
            })
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
