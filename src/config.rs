use std::num::NonZeroU32;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
            None => 8080,
        };

        let backend = get("STORE_BACKEND").unwrap_or_else(|| "postgres".into());
        let store = match backend.as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: get("DATABASE_URL")
                    .context("DATABASE_URL is required for the postgres store")?,
                max_connections: match get("DB_MAX_CONNECTIONS") {
                    Some(v) => v
                        .parse::<NonZeroU32>()
                        .context("DB_MAX_CONNECTIONS must be a positive integer")?
                        .get(),
                    None => 10,
                },
            },
            other => anyhow::bail!("unknown STORE_BACKEND: {other}"),
        };

        Ok(Self { host, port, store })
    }

    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Memory,
        }
    }
}
