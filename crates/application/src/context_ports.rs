mod permission_tables;
mod remote_store;
mod session_store;
mod site_cache;

pub use permission_tables::PermissionTableRepository;
pub use remote_store::{RemoteStore, SaveSiteInput, SaveSubsiteInput};
pub use session_store::SessionStore;
pub use site_cache::SiteCache;
