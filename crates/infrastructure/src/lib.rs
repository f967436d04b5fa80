//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_remote_store;
mod in_memory_session_store;
mod in_memory_site_cache;
mod postgres_permission_table_repository;
mod redis_session_store;
mod redis_site_cache;

pub use http_remote_store::HttpRemoteStore;
pub use in_memory_session_store::InMemorySessionStore;
pub use in_memory_site_cache::InMemorySiteCache;
pub use postgres_permission_table_repository::PostgresPermissionTableRepository;
pub use redis_session_store::RedisSessionStore;
pub use redis_site_cache::RedisSiteCache;
