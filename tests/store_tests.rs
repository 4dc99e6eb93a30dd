use anyhow::Result;
use chrono::NaiveDate;
use munaluna_tracker_bot::database::connection::DatabaseManager;
use munaluna_tracker_bot::database::models::{
    Activity, CyclePhase, NotificationTiming, Settings, SettingsPatch,
};
use munaluna_tracker_bot::error::{StorageError, TrackerError, UserError};
use munaluna_tracker_bot::store::{MemoryStore, SqliteStore, TrackerStore};
use munaluna_tracker_bot::utils::datetime::FixedClock;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

struct Backend {
    name: &'static str,
    store: Arc<dyn TrackerStore>,
    clock: Arc<FixedClock>,
    _temp_dir: Option<TempDir>,
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

async fn setup_sqlite(clock: Arc<FixedClock>) -> Result<(SqliteStore, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((SqliteStore::with_clock(db_manager, Duration::from_secs(5), clock), temp_dir))
}

/// Every test runs against both engines.
async fn backends() -> Result<Vec<Backend>> {
    let memory_clock = Arc::new(FixedClock::new(day(1)));
    let sqlite_clock = Arc::new(FixedClock::new(day(1)));
    let (sqlite, temp_dir) = setup_sqlite(sqlite_clock.clone()).await?;

    Ok(vec![
        Backend {
            name: "memory",
            store: Arc::new(MemoryStore::with_clock(memory_clock.clone())),
            clock: memory_clock,
            _temp_dir: None,
        },
        Backend {
            name: "sqlite",
            store: Arc::new(sqlite),
            clock: sqlite_clock,
            _temp_dir: Some(temp_dir),
        },
    ])
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() -> Result<()> {
    for b in backends().await? {
        for _ in 0..5 {
            b.store.ensure_user("42", "Aisha").await?;
        }
        let user = b.store.ensure_user("42", "Aisha M.").await?;

        assert_eq!(user.id, "42", "{}", b.name);
        assert_eq!(user.display_name, "Aisha M.", "{}", b.name);
        assert_eq!(user.settings, Settings::default(), "{}", b.name);

        let records = b.store.history("42", day(1), day(31)).await?;
        assert_eq!(records.len(), 1, "{}", b.name);
        assert_eq!(records[0].completed_count(), 0, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_sqlite_keeps_a_single_user_row() -> Result<()> {
    let clock = Arc::new(FixedClock::new(day(1)));
    let (store, _temp_dir) = setup_sqlite(clock).await?;

    for name in ["Aisha", "Aisha", "Aisha M."] {
        store.ensure_user("42", name).await?;
    }
    store.today_status("42").await?;

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&store.database().pool)
        .await?;
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_records")
        .fetch_one(&store.database().pool)
        .await?;
    assert_eq!(users, 1);
    assert_eq!(records, 1);
    Ok(())
}

#[tokio::test]
async fn test_marking_is_monotonic() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;
        b.store.mark_complete("42", "fajr").await?;

        for key in ["zuhr", "asr", "quran", "dhikr"] {
            b.store.mark_complete("42", key).await?;
            let record = b.store.today_status("42").await?;
            assert!(record.fajr, "{}: fajr reverted after marking {}", b.name, key);
        }
        assert_eq!(b.store.today_status("42").await?.completed_count(), 5, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_marking_twice_equals_marking_once() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;
        let once = b.store.mark_complete("42", "Maghrib").await?;
        let twice = b.store.mark_complete("42", "MAGHRIB").await?;

        assert_eq!(once, twice, "{}", b.name);
        assert!(twice.maghrib, "{}", b.name);
        assert_eq!(twice.completed_count(), 1, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_activity_leaves_record_unchanged() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;
        b.store.mark_complete("42", "isha").await?;
        let before = b.store.today_status("42").await?;

        let err = b.store.mark_complete("42", "invalid").await.unwrap_err();
        assert!(
            matches!(
                err,
                TrackerError::User(UserError::InvalidActivity { input: Some(ref k) }) if k == "invalid"
            ),
            "{}: unexpected error {:?}",
            b.name,
            err
        );
        assert_eq!(b.store.today_status("42").await?, before, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_percentage_for_each_completion_count() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("7", "Maryam").await?;
        assert_eq!(b.store.today_status("7").await?.completion_percentage(), 0);

        let mut expected = Vec::new();
        for activity in Activity::ALL {
            let record = b.store.mark_complete("7", activity.key()).await?;
            expected.push(record.completion_percentage());
        }
        assert_eq!(expected, vec![14, 29, 43, 57, 71, 86, 100], "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_fresh_user_has_default_settings() -> Result<()> {
    for b in backends().await? {
        let settings = b.store.settings("new-user").await?;
        assert!(settings.notify_fajr && settings.notify_zuhr && settings.notify_asr);
        assert!(settings.notify_maghrib && settings.notify_isha);
        assert_eq!(settings.notification_timing, NotificationTiming::Exact, "{}", b.name);
        assert_eq!(settings.menstruation_days, 5, "{}", b.name);
        assert_eq!(settings.cycle_days, 28, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_days_are_isolated() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;
        b.store.mark_complete("42", "fajr").await?;

        b.clock.set(day(2));
        let fresh = b.store.today_status("42").await?;
        assert_eq!(fresh.date, day(2), "{}", b.name);
        assert_eq!(fresh.completed_count(), 0, "{}", b.name);

        b.store.mark_complete("42", "isha").await?;

        let first = b.store.record_for_date("42", day(1)).await?.unwrap();
        assert!(first.fajr && !first.isha, "{}", b.name);
        let second = b.store.record_for_date("42", day(2)).await?.unwrap();
        assert!(second.isha && !second.fajr, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_history_is_ordered_and_bounded() -> Result<()> {
    for b in backends().await? {
        for d in [3, 1, 2, 5] {
            b.clock.set(day(d));
            b.store.ensure_user("42", "Aisha").await?;
        }

        let dates: Vec<_> = b
            .store
            .history("42", day(2), day(5))
            .await?
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(dates, vec![day(2), day(3), day(5)], "{}", b.name);

        assert!(b.store.history("42", day(5), day(1)).await?.is_empty(), "{}", b.name);
        assert!(b.store.history("nobody", day(1), day(5)).await?.is_empty(), "{}", b.name);
        assert!(b.store.record_for_date("42", day(4)).await?.is_none(), "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_settings_patch_persists_and_validates() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;

        let patch = SettingsPatch {
            notify_fajr: Some(false),
            notification_timing: Some(NotificationTiming::Minus10),
            cycle_days: Some(30),
            ..Default::default()
        };
        let updated = b.store.update_settings("42", patch).await?;
        assert!(!updated.notify_fajr, "{}", b.name);
        assert_eq!(b.store.settings("42").await?, updated, "{}", b.name);

        let bad = SettingsPatch { menstruation_days: Some(31), ..Default::default() };
        let err = b.store.update_settings("42", bad).await.unwrap_err();
        assert!(matches!(err, TrackerError::User(UserError::InvalidSettings(_))), "{}", b.name);
        assert_eq!(b.store.settings("42").await?, updated, "{}", b.name);

        // Refreshing the name never resets settings
        let user = b.store.ensure_user("42", "Aisha M.").await?;
        assert_eq!(user.settings, updated, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_marks_from_one_user_are_all_kept() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;

        let mut handles = Vec::new();
        for activity in Activity::ALL {
            let store = b.store.clone();
            handles.push(tokio::spawn(async move {
                store.mark_complete("42", activity.key()).await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        let record = b.store.today_status("42").await?;
        assert_eq!(record.completion_percentage(), 100, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_users_do_not_share_records() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("1", "Aisha").await?;
        b.store.ensure_user("2", "Maryam").await?;
        b.store.mark_complete("1", "quran").await?;

        assert!(b.store.today_status("1").await?.quran, "{}", b.name);
        assert!(!b.store.today_status("2").await?.quran, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_update_settings_creates_today_like_settings() -> Result<()> {
    for b in backends().await? {
        b.store.settings("reader").await?;
        assert!(b.store.record_for_date("reader", day(1)).await?.is_some(), "{}", b.name);

        let patch = SettingsPatch { notify_isha: Some(false), ..Default::default() };
        b.store.update_settings("writer", patch).await?;
        assert!(b.store.record_for_date("writer", day(1)).await?.is_some(), "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_start_cycle_replaces_previous_plan() -> Result<()> {
    for b in backends().await? {
        b.store.ensure_user("42", "Aisha").await?;
        assert!(b.store.cycle_days("42").await?.is_empty(), "{}", b.name);

        let first = b.store.start_cycle("42", day(1)).await?;
        assert_eq!(first.len(), 28, "{}", b.name);
        assert_eq!(b.store.cycle_days("42").await?, first, "{}", b.name);

        let patch = SettingsPatch { cycle_days: Some(21), menstruation_days: Some(4), ..Default::default() };
        b.store.update_settings("42", patch).await?;
        let second = b.store.start_cycle("42", day(10)).await?;

        let stored = b.store.cycle_days("42").await?;
        assert_eq!(stored, second, "{}", b.name);
        assert_eq!(stored.len(), 21, "{}", b.name);
        assert_eq!(stored[0].date, day(10), "{}", b.name);
        assert_eq!(stored[3].phase, CyclePhase::Menstruation, "{}", b.name);
        assert_eq!(stored[4].phase, CyclePhase::Clean, "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_set_phase_overrides_one_day() -> Result<()> {
    for b in backends().await? {
        b.store.start_cycle("42", day(1)).await?;
        b.store.set_phase("42", day(2), CyclePhase::Clean).await?;
        b.store.set_phase("42", day(31), CyclePhase::Menstruation).await?;

        let days = b.store.cycle_days("42").await?;
        assert_eq!(days.len(), 29, "{}", b.name);
        assert_eq!(days[0].phase, CyclePhase::Menstruation, "{}", b.name);
        assert_eq!(days[1].phase, CyclePhase::Clean, "{}", b.name);
        assert_eq!(days.last().map(|d| d.date), Some(day(31)), "{}", b.name);

        assert!(b.store.cycle_days("other").await?.is_empty(), "{}", b.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_sqlite_times_out_while_database_is_locked() -> Result<()> {
    let temp_dir = tempdir()?;
    let database_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    let clock = Arc::new(FixedClock::new(day(1)));
    let store = SqliteStore::with_clock(db_manager.clone(), Duration::from_secs(1), clock);
    store.ensure_user("42", "Aisha").await?;

    // Hold the write lock on a second connection
    let mut holder = db_manager.pool.begin().await?;
    sqlx::query("UPDATE users SET display_name = display_name")
        .execute(&mut *holder)
        .await?;

    let err = store.mark_complete("42", "fajr").await.unwrap_err();
    assert!(
        matches!(err, TrackerError::Storage(StorageError::Timeout(t)) if t == Duration::from_secs(1)),
        "unexpected error {:?}",
        err
    );

    holder.rollback().await?;

    let record = store.mark_complete("42", "asr").await?;
    assert!(record.asr);
    assert!(!record.fajr);
    Ok(())
}
