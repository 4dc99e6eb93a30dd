use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Activity;

/// Completion flags for one user on one calendar day.
///
/// The seven flags are fixed fields, so a record can never be missing a key.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DailyRecord {
    pub user_id: String,
    pub date: NaiveDate,
    pub fajr: bool,
    pub zuhr: bool,
    pub asr: bool,
    pub maghrib: bool,
    pub isha: bool,
    pub dhikr: bool,
    pub quran: bool,
}

impl DailyRecord {
    /// A fresh record with every flag unset.
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            fajr: false,
            zuhr: false,
            asr: false,
            maghrib: false,
            isha: false,
            dhikr: false,
            quran: false,
        }
    }

    pub fn get(&self, activity: Activity) -> bool {
        match activity {
            Activity::Fajr => self.fajr,
            Activity::Zuhr => self.zuhr,
            Activity::Asr => self.asr,
            Activity::Maghrib => self.maghrib,
            Activity::Isha => self.isha,
            Activity::Dhikr => self.dhikr,
            Activity::Quran => self.quran,
        }
    }

    /// Sets the flag for `activity`. Flags only ever move to `true`.
    pub fn mark(&mut self, activity: Activity) {
        let flag = match activity {
            Activity::Fajr => &mut self.fajr,
            Activity::Zuhr => &mut self.zuhr,
            Activity::Asr => &mut self.asr,
            Activity::Maghrib => &mut self.maghrib,
            Activity::Isha => &mut self.isha,
            Activity::Dhikr => &mut self.dhikr,
            Activity::Quran => &mut self.quran,
        };
        *flag = true;
    }

    pub fn completed_count(&self) -> usize {
        Activity::ALL.iter().filter(|a| self.get(**a)).count()
    }

    pub fn total(&self) -> usize {
        Activity::ALL.len()
    }

    /// `round(100 * completed / 7)`, recomputed on every call.
    pub fn completion_percentage(&self) -> u8 {
        let pct = (100.0 * self.completed_count() as f64 / self.total() as f64).round();
        pct as u8
    }

    pub fn pending(&self) -> Vec<Activity> {
        Activity::ALL.into_iter().filter(|a| !self.get(*a)).collect()
    }
}

impl DailyRecord {
    pub async fn find<'e, E>(executor: E, user_id: &str, date: NaiveDate) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query_as::<_, DailyRecord>(
            "SELECT user_id, date, fajr, zuhr, asr, maghrib, isha, dhikr, quran FROM daily_records WHERE user_id = ? AND date = ?"
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(executor)
        .await
    }

    /// Creates the row for `date` unless it already exists.
    pub async fn ensure<'e, E>(executor: E, user_id: &str, date: NaiveDate) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("INSERT OR IGNORE INTO daily_records (user_id, date) VALUES (?, ?)")
            .bind(user_id)
            .bind(date)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Sets one flag in a single upsert so concurrent marks never lose a flip.
    pub async fn mark_complete(
        conn: &mut sqlx::SqliteConnection,
        user_id: &str,
        date: NaiveDate,
        activity: Activity,
    ) -> Result<Self, sqlx::Error> {
        // The column name comes from the closed Activity set, never from input.
        let column = activity.key();
        let query = format!(
            "INSERT INTO daily_records (user_id, date, {column}) VALUES (?, ?, 1) \
             ON CONFLICT(user_id, date) DO UPDATE SET {column} = 1"
        );
        sqlx::query(&query)
            .bind(user_id)
            .bind(date)
            .execute(&mut *conn)
            .await?;

        Self::find(&mut *conn, user_id, date)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_range(
        pool: &sqlx::SqlitePool,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(
            "SELECT user_id, date, fajr, zuhr, asr, maghrib, isha, dhikr, quran FROM daily_records WHERE user_id = ? AND date >= ? AND date <= ? ORDER BY date"
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}
