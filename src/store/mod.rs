//! Per-user daily worship tracking.
//!
//! [`TrackerStore`] is the only place that owns user state. Two engines
//! implement it: [`MemoryStore`] for tests and ephemeral deployments, and
//! [`SqliteStore`] for durable storage.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::database::models::{Activity, CycleDay, CyclePhase, DailyRecord, Settings, SettingsPatch, User};
use crate::error::{StorageResult, TrackerResult};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Short engine name for logs and health output.
    fn backend(&self) -> &'static str;

    /// The calendar date this store treats as today.
    fn today(&self) -> NaiveDate;

    /// Creates the user with default settings or refreshes their name, and
    /// guarantees a record for today exists.
    async fn ensure_user(&self, user_id: &str, display_name: &str) -> StorageResult<User>;

    /// Today's record. Creates the user and the record when missing but
    /// keeps an existing user's name.
    async fn today_status(&self, user_id: &str) -> StorageResult<DailyRecord>;

    /// Sets one activity's flag for today. Flags never revert.
    async fn mark_activity(&self, user_id: &str, activity: Activity) -> StorageResult<DailyRecord>;

    /// Marks one activity done for today. `activity_key` is matched
    /// case-insensitively against the fixed key set; anything else fails
    /// with `InvalidActivity` before the store is touched.
    async fn mark_complete(&self, user_id: &str, activity_key: &str) -> TrackerResult<DailyRecord> {
        let activity: Activity = activity_key.parse()?;
        Ok(self.mark_activity(user_id, activity).await?)
    }

    async fn settings(&self, user_id: &str) -> StorageResult<Settings>;

    async fn update_settings(&self, user_id: &str, patch: SettingsPatch) -> TrackerResult<Settings>;

    /// Read-only lookup of a single day. Never creates rows.
    async fn record_for_date(&self, user_id: &str, date: NaiveDate) -> StorageResult<Option<DailyRecord>>;

    /// Records in `from..=to`, oldest first.
    async fn history(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> StorageResult<Vec<DailyRecord>>;

    /// Replaces the user's recorded cycle with a fresh plan starting at
    /// `start`, laid out from the user's current cycle settings.
    async fn start_cycle(&self, user_id: &str, start: NaiveDate) -> StorageResult<Vec<CycleDay>>;

    /// Recorded cycle days, oldest first. Never creates rows.
    async fn cycle_days(&self, user_id: &str) -> StorageResult<Vec<CycleDay>>;

    /// Sets the phase of a single date, keeping the rest of the cycle.
    async fn set_phase(&self, user_id: &str, date: NaiveDate, phase: CyclePhase) -> StorageResult<CycleDay>;

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
