use scopewise_core::{AppError, AppResult, Identity};
use scopewise_domain::PermissionAction;

const USAGE: &str = "usage: scopewise hydrate <company> [site] [subsite]\n       scopewise check <company> <uid> <role> <department> <module> <page> <action>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Hydrate {
        company_id: String,
        site_id: Option<String>,
        subsite_id: Option<String>,
    },
    Check {
        company_id: String,
        identity: Identity,
        module: String,
        page: String,
        action: PermissionAction,
    },
}

impl CliCommand {
    pub fn parse(arguments: impl IntoIterator<Item = String>) -> AppResult<Self> {
        let arguments: Vec<String> = arguments.into_iter().collect();
        let Some((command, rest)) = arguments.split_first() else {
            return Err(usage_error());
        };

        match (command.as_str(), rest) {
            ("hydrate", [company_id]) => Ok(Self::Hydrate {
                company_id: company_id.clone(),
                site_id: None,
                subsite_id: None,
            }),
            ("hydrate", [company_id, site_id]) => Ok(Self::Hydrate {
                company_id: company_id.clone(),
                site_id: Some(site_id.clone()),
                subsite_id: None,
            }),
            ("hydrate", [company_id, site_id, subsite_id]) => Ok(Self::Hydrate {
                company_id: company_id.clone(),
                site_id: Some(site_id.clone()),
                subsite_id: Some(subsite_id.clone()),
            }),
            ("check", [company_id, uid, role, department, module, page, action]) => {
                Ok(Self::Check {
                    company_id: company_id.clone(),
                    identity: Identity::new(uid.as_str(), role.as_str(), department.as_str()),
                    module: module.clone(),
                    page: page.clone(),
                    action: action.parse()?,
                })
            }
            _ => Err(usage_error()),
        }
    }
}

fn usage_error() -> AppError {
    AppError::InvalidInput(USAGE.to_owned())
}
