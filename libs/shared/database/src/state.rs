use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use shared_config::AppConfig;

use crate::migrations::{ADMIN_MIGRATIONS, DOCTORS_MIGRATIONS};
use crate::DbPool;

/// Shared application state handed to every router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub doctors_db: DbPool,
    pub admin_db: DbPool,
    pub http: Client,
}

impl AppState {
    /// Open both databases from the configured paths and bring their
    /// schemas up to date.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let doctors_db = DbPool::new(&config.doctors_db_path).await?;
        let admin_db = DbPool::new(&config.admin_db_path).await?;
        Self::with_pools(config, doctors_db, admin_db).await
    }

    pub async fn with_pools(config: AppConfig, doctors_db: DbPool, admin_db: DbPool) -> Result<Self> {
        doctors_db.migrate(DOCTORS_MIGRATIONS).await?;
        admin_db.migrate(ADMIN_MIGRATIONS).await?;

        Ok(Self {
            config: Arc::new(config),
            doctors_db,
            admin_db,
            http: Client::new(),
        })
    }

    /// Fresh in-memory databases, used by tests.
    pub async fn in_memory(config: AppConfig) -> Result<Self> {
        let doctors_db = DbPool::in_memory().await?;
        let admin_db = DbPool::in_memory().await?;
        Self::with_pools(config, doctors_db, admin_db).await
    }
}
