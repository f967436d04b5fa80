//! Scopewise command line: hydrates a tenant scope or answers one access check.

#![forbid(unsafe_code)]

mod cli_command;
mod cli_config;

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use scopewise_application::{
    AccessRequest, ContextService, HydrationOutcome, PermissionPolicy, PermissionService,
    PermissionTableRepository, ScopeManager, SessionPersistence, SessionStore, SiteCache,
};
use scopewise_core::{AppError, AppResult, CompanyId, Identity};
use scopewise_domain::{
    PermissionAction, PermissionOverrides, Selection, TENANT_SCOPED_MODULES,
};
use scopewise_infrastructure::{
    HttpRemoteStore, InMemorySessionStore, InMemorySiteCache, PostgresPermissionTableRepository,
    RedisSessionStore, RedisSiteCache,
};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli_command::CliCommand;
use cli_config::CliConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HydrationReport {
    company_id: String,
    outcome: String,
    site_count: usize,
    site: Option<Selection>,
    subsite: Option<Selection>,
    scope_path: Option<String>,
    module_paths: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    company_id: String,
    uid: String,
    module: String,
    page: String,
    action: PermissionAction,
    allowed: bool,
    viewable_pages: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = CliCommand::parse(env::args().skip(1))?;
    let config = CliConfig::load()?;
    let context = build_context(&config).await?;

    info!(
        remote_url = %config.remote_url,
        redis = config.redis_url.is_some(),
        postgres = config.database_url.is_some(),
        "scopewise-cli started"
    );

    match command {
        CliCommand::Hydrate {
            company_id,
            site_id,
            subsite_id,
        } => {
            let report = hydrate(
                &context,
                company_id.as_str(),
                site_id.as_deref(),
                subsite_id.as_deref(),
            )
            .await?;
            print_json(&report)
        }
        CliCommand::Check {
            company_id,
            identity,
            module,
            page,
            action,
        } => {
            let report = check(&context, company_id.as_str(), identity, module, page, action).await?;
            print_json(&report)
        }
    }
}

async fn build_context(config: &CliConfig) -> AppResult<ContextService> {
    let http_client = HttpRemoteStore::build_client(config.http_timeout)?;
    let remote_store = Arc::new(HttpRemoteStore::new(
        http_client,
        config.remote_url.clone(),
        config.remote_token.clone(),
    ));

    let (site_cache, session_store) = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url)
                .map_err(|error| AppError::InvalidInput(format!("invalid REDIS_URL: {error}")))?;
            let site_cache: Arc<dyn SiteCache> = Arc::new(RedisSiteCache::new(
                client.clone(),
                config.redis_key_prefix.clone(),
            ));
            let session_store: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(
                client,
                config.redis_key_prefix.as_str(),
                config.session_id.as_str(),
            ));
            (site_cache, session_store)
        }
        None => {
            let site_cache: Arc<dyn SiteCache> = Arc::new(InMemorySiteCache::new());
            let session_store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
            (site_cache, session_store)
        }
    };

    let permission_tables: Arc<dyn PermissionTableRepository> =
        match config.database_url.as_deref() {
            Some(database_url) => Arc::new(PostgresPermissionTableRepository::new(
                connect_pool(database_url).await?,
            )),
            None => remote_store.clone(),
        };

    Ok(ContextService::new(
        ScopeManager::spawn(),
        remote_store,
        site_cache,
        SessionPersistence::new(session_store),
        PermissionService::new(
            permission_tables,
            PermissionPolicy {
                fail_open_while_loading: config.fail_open_while_loading,
            },
        ),
    ))
}

async fn hydrate(
    context: &ContextService,
    company_id: &str,
    site_id: Option<&str>,
    subsite_id: Option<&str>,
) -> AppResult<HydrationReport> {
    if let Some(restored) = context.restore_session().await? {
        info!(company_id = %restored, "previous session found");
    }

    let outcome = context.set_tenant(company_id).await?;
    if outcome == HydrationOutcome::ServedFromCache {
        // Joins the fetch started in the background.
        context.refresh_sites(false).await?;
    }

    if let Some(site_id) = site_id {
        let scope = context.snapshot().await;
        let name = scope
            .sites()
            .iter()
            .find(|site| site.site_id == site_id)
            .map(|site| site.name.clone())
            .unwrap_or_default();
        context.select_site(site_id, name.as_str()).await?;
    }

    if let Some(subsite_id) = subsite_id {
        let scope = context.snapshot().await;
        let name = scope
            .subsites()
            .iter()
            .find(|subsite| subsite.subsite_id == subsite_id)
            .map(|subsite| subsite.name.clone())
            .unwrap_or_default();
        context.select_subsite(subsite_id, name.as_str()).await?;
    }

    let scope = context.snapshot().await;
    let mut module_paths = BTreeMap::new();
    let configured = scope.effective_config();
    let modules = TENANT_SCOPED_MODULES
        .iter()
        .copied()
        .chain(configured.modules().map(|(module, _)| module));
    for module in modules {
        module_paths.insert(module.to_owned(), context.module_path(module).await);
    }

    Ok(HydrationReport {
        company_id: company_id.trim().to_owned(),
        outcome: format!("{outcome:?}"),
        site_count: scope.sites().len(),
        site: scope.site().cloned(),
        subsite: scope.subsite().cloned(),
        scope_path: context.scope_path().await,
        module_paths,
    })
}

async fn check(
    context: &ContextService,
    company_id: &str,
    identity: Identity,
    module: String,
    page: String,
    action: PermissionAction,
) -> AppResult<CheckReport> {
    let company_id = CompanyId::new(company_id)?;
    let permissions = context.permissions();
    permissions.refresh_table(&company_id).await?;

    let allowed = permissions
        .check(
            &identity,
            &company_id,
            AccessRequest::new(module.as_str(), page.as_str(), action),
            PermissionOverrides::default(),
        )
        .await;
    let viewable_pages = permissions
        .accessible_pages(&identity, &company_id, module.as_str())
        .await
        .into_iter()
        .collect();

    info!(
        company_id = %company_id,
        uid = identity.uid(),
        allowed,
        "access check resolved"
    );

    Ok(CheckReport {
        company_id: company_id.to_string(),
        uid: identity.uid().to_owned(),
        module,
        page,
        action,
        allowed,
        viewable_pages,
    })
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn print_json<T: Serialize>(report: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(report)
        .map_err(|error| AppError::Internal(format!("failed to render report: {error}")))?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
