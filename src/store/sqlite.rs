use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::TrackerStore;
use crate::database::connection::DatabaseManager;
use crate::database::models::{
    plan_cycle, Activity, CycleDay, CyclePhase, DailyRecord, Settings, SettingsPatch, User, UserRow,
};
use crate::error::{StorageError, StorageResult, TrackerError, TrackerResult};
use crate::utils::datetime::{Clock, SystemClock};
use crate::utils::logging::{log_database_error, log_database_operation, log_timeout};

/// Durable store backed by the `users`, `daily_records` and `cycle_days` tables.
pub struct SqliteStore {
    db: DatabaseManager,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl SqliteStore {
    pub fn new(db: DatabaseManager, timeout: Duration) -> Self {
        Self::with_clock(db, timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DatabaseManager, timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock, timeout }
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    /// Runs `fut` under the configured timeout, logging failures.
    async fn bounded<T, E, F>(&self, operation: &str, table: &str, user_id: Option<&str>, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<StorageError> + std::fmt::Display,
    {
        let details = user_id.map(|id| format!("user {id}"));
        log_database_operation(operation, table, details.as_deref());
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                log_database_error(operation, table, &e.to_string(), details.as_deref());
                Err(e)
            }
            Err(_) => {
                let context = format!("{table}{}", details.map(|d| format!(", {d}")).unwrap_or_default());
                log_timeout(operation, self.timeout.as_secs(), Some(context.as_str()));
                Err(StorageError::Timeout(self.timeout).into())
            }
        }
    }

    fn default_settings_json() -> StorageResult<String> {
        Ok(Settings::default().to_json()?)
    }
}

#[async_trait]
impl TrackerStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn ensure_user(&self, user_id: &str, display_name: &str) -> StorageResult<User> {
        let today = self.clock.today();
        let defaults = Self::default_settings_json()?;
        self.bounded("ensure_user", "users", Some(user_id), async {
            let mut tx = self.db.pool.begin().await?;
            UserRow::upsert(&mut *tx, user_id, display_name, &defaults).await?;
            DailyRecord::ensure(&mut *tx, user_id, today).await?;
            let row = UserRow::find(&mut *tx, user_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            tx.commit().await?;
            Ok::<_, StorageError>(row.into_user()?)
        })
        .await
    }

    async fn today_status(&self, user_id: &str) -> StorageResult<DailyRecord> {
        let today = self.clock.today();
        let defaults = Self::default_settings_json()?;
        self.bounded("today_status", "daily_records", Some(user_id), async {
            let mut tx = self.db.pool.begin().await?;
            UserRow::insert_if_missing(&mut *tx, user_id, &defaults).await?;
            DailyRecord::ensure(&mut *tx, user_id, today).await?;
            let record = DailyRecord::find(&mut *tx, user_id, today)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            tx.commit().await?;
            Ok::<_, StorageError>(record)
        })
        .await
    }

    async fn mark_activity(&self, user_id: &str, activity: Activity) -> StorageResult<DailyRecord> {
        let today = self.clock.today();
        let defaults = Self::default_settings_json()?;
        self.bounded("mark_activity", "daily_records", Some(user_id), async {
            let mut tx = self.db.pool.begin().await?;
            UserRow::insert_if_missing(&mut *tx, user_id, &defaults).await?;
            let record = DailyRecord::mark_complete(&mut tx, user_id, today, activity).await?;
            tx.commit().await?;
            Ok::<_, StorageError>(record)
        })
        .await
    }

    async fn settings(&self, user_id: &str) -> StorageResult<Settings> {
        let user = self.ensure_existing(user_id).await?;
        Ok(user.settings)
    }

    async fn update_settings(&self, user_id: &str, patch: SettingsPatch) -> TrackerResult<Settings> {
        let today = self.clock.today();
        let defaults = Self::default_settings_json()?;
        self.bounded("update_settings", "users", Some(user_id), async {
            let mut tx = self.db.pool.begin().await.map_err(StorageError::from)?;
            UserRow::insert_if_missing(&mut *tx, user_id, &defaults)
                .await
                .map_err(StorageError::from)?;
            DailyRecord::ensure(&mut *tx, user_id, today)
                .await
                .map_err(StorageError::from)?;
            let row = UserRow::find(&mut *tx, user_id)
                .await
                .map_err(StorageError::from)?
                .ok_or(StorageError::Database(sqlx::Error::RowNotFound))?;
            let current = Settings::from_json(row.settings.as_deref()).map_err(StorageError::from)?;
            let next = current.apply(&patch)?;
            let json = next.to_json().map_err(StorageError::from)?;
            UserRow::update_settings(&mut *tx, user_id, &json)
                .await
                .map_err(StorageError::from)?;
            tx.commit().await.map_err(StorageError::from)?;
            Ok::<_, TrackerError>(next)
        })
        .await
    }

    async fn record_for_date(&self, user_id: &str, date: NaiveDate) -> StorageResult<Option<DailyRecord>> {
        self.bounded("record_for_date", "daily_records", Some(user_id), async {
            Ok::<_, StorageError>(DailyRecord::find(&self.db.pool, user_id, date).await?)
        })
        .await
    }

    async fn history(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> StorageResult<Vec<DailyRecord>> {
        if from > to {
            return Ok(Vec::new());
        }
        self.bounded("history", "daily_records", Some(user_id), async {
            Ok::<_, StorageError>(DailyRecord::find_range(&self.db.pool, user_id, from, to).await?)
        })
        .await
    }

    async fn start_cycle(&self, user_id: &str, start: NaiveDate) -> StorageResult<Vec<CycleDay>> {
        let defaults = Self::default_settings_json()?;
        self.bounded("start_cycle", "cycle_days", Some(user_id), async {
            let mut tx = self.db.pool.begin().await?;
            UserRow::insert_if_missing(&mut *tx, user_id, &defaults).await?;
            let row = UserRow::find(&mut *tx, user_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            let settings = Settings::from_json(row.settings.as_deref())?;
            let plan = plan_cycle(user_id, start, &settings);

            CycleDay::delete_for_user(&mut *tx, user_id).await?;
            for day in &plan {
                day.upsert(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok::<_, StorageError>(plan)
        })
        .await
    }

    async fn cycle_days(&self, user_id: &str) -> StorageResult<Vec<CycleDay>> {
        self.bounded("cycle_days", "cycle_days", Some(user_id), async {
            Ok::<_, StorageError>(CycleDay::find_all(&self.db.pool, user_id).await?)
        })
        .await
    }

    async fn set_phase(&self, user_id: &str, date: NaiveDate, phase: CyclePhase) -> StorageResult<CycleDay> {
        let defaults = Self::default_settings_json()?;
        let day = CycleDay::new(user_id, date, phase);
        self.bounded("set_phase", "cycle_days", Some(user_id), async {
            let mut tx = self.db.pool.begin().await?;
            UserRow::insert_if_missing(&mut *tx, user_id, &defaults).await?;
            day.upsert(&mut *tx).await?;
            tx.commit().await?;
            Ok::<_, StorageError>(())
        })
        .await?;
        Ok(day)
    }

    async fn ping(&self) -> StorageResult<()> {
        self.bounded("ping", "sqlite_master", None, async {
            sqlx::query("SELECT 1").execute(&self.db.pool).await?;
            Ok::<_, StorageError>(())
        })
        .await
    }
}

impl SqliteStore {
    /// Creates the user and today's record when missing, without touching
    /// an existing user's name.
    async fn ensure_existing(&self, user_id: &str) -> StorageResult<User> {
        let today = self.clock.today();
        let defaults = Self::default_settings_json()?;
        self.bounded("ensure_existing", "users", Some(user_id), async {
            let mut tx = self.db.pool.begin().await?;
            UserRow::insert_if_missing(&mut *tx, user_id, &defaults).await?;
            DailyRecord::ensure(&mut *tx, user_id, today).await?;
            let row = UserRow::find(&mut *tx, user_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            tx.commit().await?;
            Ok::<_, StorageError>(row.into_user()?)
        })
        .await
    }
}
