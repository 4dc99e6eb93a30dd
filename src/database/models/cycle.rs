use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::Settings;
use crate::error::UserError;

/// One-based day of the cycle on which ovulation starts.
pub const OVULATION_DAY: u32 = 14;
/// Number of days marked as ovulation.
pub const OVULATION_LENGTH: u32 = 2;

/// Phase of the menstrual cycle a calendar day belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstruation,
    Clean,
    Ovulation,
}

impl CyclePhase {
    pub const ALL: [CyclePhase; 3] = [CyclePhase::Menstruation, CyclePhase::Clean, CyclePhase::Ovulation];

    pub fn key(self) -> &'static str {
        match self {
            CyclePhase::Menstruation => "menstruation",
            CyclePhase::Clean => "clean",
            CyclePhase::Ovulation => "ovulation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CyclePhase::Menstruation => "Menstruation",
            CyclePhase::Clean => "Clean days",
            CyclePhase::Ovulation => "Ovulation",
        }
    }

    /// Phase of the zero-based `offset` day of a planned cycle. Menstruation
    /// wins when it overlaps the ovulation window.
    pub fn for_offset(offset: u32, menstruation_days: u32) -> Self {
        let ovulation_start = OVULATION_DAY - 1;
        if offset < menstruation_days {
            CyclePhase::Menstruation
        } else if (ovulation_start..ovulation_start + OVULATION_LENGTH).contains(&offset) {
            CyclePhase::Ovulation
        } else {
            CyclePhase::Clean
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CyclePhase {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        CyclePhase::ALL
            .into_iter()
            .find(|p| p.key() == normalized)
            .ok_or_else(|| UserError::InvalidPhase { input: s.trim().to_string() })
    }
}

/// The phase recorded for one user on one date.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CycleDay {
    pub user_id: String,
    pub date: NaiveDate,
    pub phase: CyclePhase,
}

impl CycleDay {
    pub fn new(user_id: impl Into<String>, date: NaiveDate, phase: CyclePhase) -> Self {
        Self { user_id: user_id.into(), date, phase }
    }
}

/// Lays out one full cycle from `start` using the user's cycle lengths.
pub fn plan_cycle(user_id: &str, start: NaiveDate, settings: &Settings) -> Vec<CycleDay> {
    (0..settings.cycle_days)
        .map_while(|offset| {
            let date = start.checked_add_days(Days::new(u64::from(offset)))?;
            let phase = CyclePhase::for_offset(offset, settings.menstruation_days);
            Some(CycleDay::new(user_id, date, phase))
        })
        .collect()
}

/// A run of consecutive days sharing one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpan {
    pub phase: CyclePhase,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Where `date` sits in the recorded cycle and what comes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOverview {
    pub date: NaiveDate,
    pub current: Option<PhaseSpan>,
    pub next: Option<PhaseSpan>,
}

impl CycleOverview {
    /// `days` must be ordered by date, as the stores return them.
    pub fn new(days: &[CycleDay], date: NaiveDate) -> Self {
        let current_idx = days.iter().position(|d| d.date == date);
        let current = current_idx.map(|i| span(days, i));

        let next_idx = match (current_idx, current) {
            (Some(i), Some(cur)) => days[i..]
                .iter()
                .position(|d| d.date > cur.end)
                .map(|offset| i + offset),
            _ => days.iter().position(|d| d.date > date),
        };

        Self {
            date,
            current,
            next: next_idx.map(|i| span(days, i)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.next.is_none()
    }
}

fn span(days: &[CycleDay], i: usize) -> PhaseSpan {
    let phase = days[i].phase;
    let joined = |a: &CycleDay, b: &CycleDay| {
        a.phase == phase && b.phase == phase && a.date.succ_opt() == Some(b.date)
    };

    let mut lo = i;
    while lo > 0 && joined(&days[lo - 1], &days[lo]) {
        lo -= 1;
    }
    let mut hi = i;
    while hi + 1 < days.len() && joined(&days[hi], &days[hi + 1]) {
        hi += 1;
    }

    PhaseSpan { phase, start: days[lo].date, end: days[hi].date }
}

impl CycleDay {
    /// All recorded days for the user, oldest first.
    pub async fn find_all<'e, E>(executor: E, user_id: &str) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query_as::<_, CycleDay>(
            "SELECT user_id, date, phase FROM cycle_days WHERE user_id = ? ORDER BY date"
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    pub async fn delete_for_user<'e, E>(executor: E, user_id: &str) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("DELETE FROM cycle_days WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Inserts or overwrites the phase for this row's date.
    pub async fn upsert<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            "INSERT INTO cycle_days (user_id, date, phase) VALUES (?, ?, ?) \
             ON CONFLICT(user_id, date) DO UPDATE SET phase = excluded.phase"
        )
        .bind(&self.user_id)
        .bind(self.date)
        .bind(self.phase)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn phases(plan: &[CycleDay]) -> Vec<CyclePhase> {
        plan.iter().map(|d| d.phase).collect()
    }

    #[test]
    fn test_default_plan_layout() {
        let plan = plan_cycle("42", day(1), &Settings::default());
        assert_eq!(plan.len(), 28);
        assert_eq!(plan[0].date, day(1));
        assert_eq!(plan[27].date, day(28));

        let p = phases(&plan);
        assert!(p[..5].iter().all(|x| *x == CyclePhase::Menstruation));
        assert!(p[5..13].iter().all(|x| *x == CyclePhase::Clean));
        assert_eq!(p[13..15], [CyclePhase::Ovulation, CyclePhase::Ovulation]);
        assert!(p[15..].iter().all(|x| *x == CyclePhase::Clean));
    }

    #[test]
    fn test_short_cycle_is_truncated() {
        let settings = Settings { cycle_days: 14, menstruation_days: 3, ..Settings::default() };
        let plan = plan_cycle("42", day(1), &settings);
        assert_eq!(plan.len(), 14);
        assert_eq!(plan[13].phase, CyclePhase::Ovulation);

        let empty = Settings { cycle_days: 0, menstruation_days: 0, ..Settings::default() };
        assert!(plan_cycle("42", day(1), &empty).is_empty());
    }

    #[test]
    fn test_long_menstruation_overrides_ovulation() {
        let settings = Settings { cycle_days: 20, menstruation_days: 15, ..Settings::default() };
        let p = phases(&plan_cycle("42", day(1), &settings));
        assert!(!p.contains(&CyclePhase::Ovulation));
        assert_eq!(p[15], CyclePhase::Clean);
    }

    #[test]
    fn test_overview_finds_current_and_next_span() {
        let plan = plan_cycle("42", day(1), &Settings::default());

        let overview = CycleOverview::new(&plan, day(3));
        assert_eq!(
            overview.current,
            Some(PhaseSpan { phase: CyclePhase::Menstruation, start: day(1), end: day(5) })
        );
        assert_eq!(
            overview.next,
            Some(PhaseSpan { phase: CyclePhase::Clean, start: day(6), end: day(13) })
        );

        let last = CycleOverview::new(&plan, day(28));
        assert_eq!(last.current.map(|s| s.start), Some(day(16)));
        assert!(last.next.is_none());
    }

    #[test]
    fn test_overview_outside_plan() {
        let plan = plan_cycle("42", day(10), &Settings::default());

        let before = CycleOverview::new(&plan, day(2));
        assert!(before.current.is_none());
        assert_eq!(before.next.map(|s| s.start), Some(day(10)));

        assert!(CycleOverview::new(&[], day(2)).is_empty());
    }

    #[test]
    fn test_gap_splits_span() {
        let days = vec![
            CycleDay::new("42", day(1), CyclePhase::Clean),
            CycleDay::new("42", day(2), CyclePhase::Clean),
            CycleDay::new("42", day(5), CyclePhase::Clean),
        ];
        let overview = CycleOverview::new(&days, day(2));
        assert_eq!(overview.current.map(|s| (s.start, s.end)), Some((day(1), day(2))));
        assert_eq!(overview.next.map(|s| s.start), Some(day(5)));
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!(" Ovulation ".parse::<CyclePhase>().unwrap(), CyclePhase::Ovulation);
        assert_eq!(
            "spring".parse::<CyclePhase>().unwrap_err(),
            UserError::InvalidPhase { input: "spring".to_string() }
        );
    }
}
