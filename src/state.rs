use crate::config::{AppConfig, StoreBackend};
use crate::users::memory::MemoryUserStore;
use crate::users::repo::{PgUserStore, UserStore};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    /// Present only for the postgres backend; used to run migrations.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        match &config.store {
            StoreBackend::Postgres {
                database_url,
                max_connections,
            } => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(*max_connections)
                    .connect(database_url)
                    .await
                    .context("connect to database")?;
                let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
                Ok(Self {
                    config,
                    store,
                    db: Some(db),
                })
            }
            StoreBackend::Memory => Ok(Self::from_parts(config, Arc::new(MemoryUserStore::new()))),
        }
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        Self {
            config,
            store,
            db: None,
        }
    }

    /// Fresh state over an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::in_memory()),
            Arc::new(MemoryUserStore::new()),
        )
    }
}
