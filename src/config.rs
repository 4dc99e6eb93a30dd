use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::validation::{validate_database_url, validate_timeout_secs};

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/munaluna_tracker.db";

/// Which engine backs the tracker store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("Invalid STORAGE_BACKEND '{}', expected sqlite or memory", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub storage_backend: StorageBackend,
    pub storage_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = Self::database_url_from_env()?;

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => StorageBackend::Sqlite,
        };

        let timeout_str = env::var("STORAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string());
        let timeout_secs: u64 = timeout_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid STORAGE_TIMEOUT_SECS"))?;
        validate_timeout_secs(timeout_secs)?;

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            storage_backend,
            storage_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// `DATABASE_URL` with its default applied. Needs no bot token.
    pub fn database_url_from_env() -> Result<String> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let database_url = if database_url.trim().is_empty() {
            DEFAULT_DATABASE_URL.to_string()
        } else {
            database_url
        };
        validate_database_url(&database_url)?;
        Ok(database_url)
    }
}
