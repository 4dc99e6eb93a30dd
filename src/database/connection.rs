use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::StorageResult;

#[derive(Clone)]
pub struct DatabaseManager {
    pub pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> StorageResult<Self> {
        Self::with_timeout(database_url, Duration::from_secs(5)).await
    }

    /// Opens the pool; acquiring a connection fails after `acquire_timeout`.
    pub async fn with_timeout(database_url: &str, acquire_timeout: Duration) -> StorageResult<Self> {
        ensure_parent_dir(database_url)?;

        // Create database if it doesn't exist
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            info!("Creating database {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Names of the user tables currently present.
    pub async fn table_names(&self) -> StorageResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

/// Filesystem path of a `sqlite:` URL, or `None` for in-memory databases.
pub fn sqlite_path(database_url: &str) -> Option<&str> {
    let path = database_url.strip_prefix("sqlite:")?;
    let path = path.strip_prefix("//").unwrap_or(path);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

fn ensure_parent_dir(database_url: &str) -> StorageResult<()> {
    let Some(parent) = sqlite_path(database_url).and_then(|p| Path::new(p).parent()) else {
        return Ok(());
    };
    if !parent.as_os_str().is_empty() && !parent.exists() {
        info!("Creating directory {}", parent.display());
        std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
    }
    Ok(())
}
