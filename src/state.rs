use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::{AuthorizationResolver, CredentialHasher};
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub hasher: Arc<CredentialHasher>,
    pub resolver: AuthorizationResolver,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(config.auth.hash_memory_kib, config.auth.hash_iterations)
            .map_err(|e| anyhow::anyhow!("Invalid password hashing parameters: {e}"))?;
        let resolver = AuthorizationResolver::new(config.auth.session_idle_hours);

        Ok(Self {
            db,
            config: Arc::new(config),
            hasher: Arc::new(hasher),
            resolver,
        })
    }
}
