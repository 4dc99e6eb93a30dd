use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::TrackerStore;
use crate::database::models::{
    plan_cycle, Activity, CycleDay, CyclePhase, DailyRecord, Settings, SettingsPatch, User,
};
use crate::error::{StorageResult, TrackerResult};
use crate::utils::datetime::{Clock, SystemClock};

struct UserSlot {
    user: User,
    records: BTreeMap<NaiveDate, DailyRecord>,
    cycle: BTreeMap<NaiveDate, CyclePhase>,
}

impl UserSlot {
    fn new(user_id: &str, display_name: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            user: User {
                id: user_id.to_string(),
                display_name: display_name.to_string(),
                settings: Settings::default(),
                created_at: now.clone(),
                updated_at: now,
            },
            records: BTreeMap::new(),
            cycle: BTreeMap::new(),
        }
    }

    fn day_record(&mut self, date: NaiveDate) -> &mut DailyRecord {
        let user_id = &self.user.id;
        self.records
            .entry(date)
            .or_insert_with(|| DailyRecord::new(user_id.clone(), date))
    }
}

/// Process-local store. Each user has their own lock, so commands from one
/// user are serialized while different users never wait on each other.
pub struct MemoryStore {
    users: RwLock<HashMap<String, Arc<Mutex<UserSlot>>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn existing_slot(&self, user_id: &str) -> Option<Arc<Mutex<UserSlot>>> {
        self.users.read().await.get(user_id).cloned()
    }

    async fn slot(&self, user_id: &str, display_name: &str) -> Arc<Mutex<UserSlot>> {
        if let Some(slot) = self.existing_slot(user_id).await {
            return slot;
        }
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::info!("Created new user: {}", user_id);
                Arc::new(Mutex::new(UserSlot::new(user_id, display_name)))
            })
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackerStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn ensure_user(&self, user_id: &str, display_name: &str) -> StorageResult<User> {
        let today = self.clock.today();
        let slot = self.slot(user_id, display_name).await;
        let mut slot = slot.lock().await;
        if slot.user.display_name != display_name {
            slot.user.display_name = display_name.to_string();
            slot.user.updated_at = Utc::now().to_rfc3339();
        }
        slot.day_record(today);
        Ok(slot.user.clone())
    }

    async fn today_status(&self, user_id: &str) -> StorageResult<DailyRecord> {
        let today = self.clock.today();
        let slot = self.slot(user_id, "").await;
        let mut slot = slot.lock().await;
        Ok(slot.day_record(today).clone())
    }

    async fn mark_activity(&self, user_id: &str, activity: Activity) -> StorageResult<DailyRecord> {
        let today = self.clock.today();
        let slot = self.slot(user_id, "").await;
        let mut slot = slot.lock().await;
        let record = slot.day_record(today);
        record.mark(activity);
        Ok(record.clone())
    }

    async fn settings(&self, user_id: &str) -> StorageResult<Settings> {
        let today = self.clock.today();
        let slot = self.slot(user_id, "").await;
        let mut slot = slot.lock().await;
        slot.day_record(today);
        Ok(slot.user.settings.clone())
    }

    async fn update_settings(&self, user_id: &str, patch: SettingsPatch) -> TrackerResult<Settings> {
        let today = self.clock.today();
        let slot = self.slot(user_id, "").await;
        let mut slot = slot.lock().await;
        slot.day_record(today);
        let next = slot.user.settings.apply(&patch)?;
        slot.user.settings = next.clone();
        slot.user.updated_at = Utc::now().to_rfc3339();
        Ok(next)
    }

    async fn record_for_date(&self, user_id: &str, date: NaiveDate) -> StorageResult<Option<DailyRecord>> {
        let Some(slot) = self.existing_slot(user_id).await else {
            return Ok(None);
        };
        let slot = slot.lock().await;
        Ok(slot.records.get(&date).cloned())
    }

    async fn history(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> StorageResult<Vec<DailyRecord>> {
        if from > to {
            return Ok(Vec::new());
        }
        let Some(slot) = self.existing_slot(user_id).await else {
            return Ok(Vec::new());
        };
        let slot = slot.lock().await;
        Ok(slot.records.range(from..=to).map(|(_, r)| r.clone()).collect())
    }

    async fn start_cycle(&self, user_id: &str, start: NaiveDate) -> StorageResult<Vec<CycleDay>> {
        let slot = self.slot(user_id, "").await;
        let mut slot = slot.lock().await;
        let plan = plan_cycle(user_id, start, &slot.user.settings);
        slot.cycle = plan.iter().map(|d| (d.date, d.phase)).collect();
        Ok(plan)
    }

    async fn cycle_days(&self, user_id: &str) -> StorageResult<Vec<CycleDay>> {
        let Some(slot) = self.existing_slot(user_id).await else {
            return Ok(Vec::new());
        };
        let slot = slot.lock().await;
        Ok(slot
            .cycle
            .iter()
            .map(|(date, phase)| CycleDay::new(user_id, *date, *phase))
            .collect())
    }

    async fn set_phase(&self, user_id: &str, date: NaiveDate, phase: CyclePhase) -> StorageResult<CycleDay> {
        let slot = self.slot(user_id, "").await;
        let mut slot = slot.lock().await;
        slot.cycle.insert(date, phase);
        Ok(CycleDay::new(user_id, date, phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::datetime::FixedClock;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_user_creates_one_user_and_one_record() {
        let store = MemoryStore::with_clock(Arc::new(FixedClock::new(day(1))));
        for _ in 0..3 {
            store.ensure_user("42", "Aisha").await.unwrap();
        }
        let user = store.ensure_user("42", "Aisha B.").await.unwrap();

        assert_eq!(store.user_count().await, 1);
        assert_eq!(user.display_name, "Aisha B.");
        assert_eq!(store.history("42", day(1), day(31)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_today_status_keeps_existing_name() {
        let store = MemoryStore::new();
        store.ensure_user("7", "Maryam").await.unwrap();
        store.today_status("7").await.unwrap();
        let user = store.ensure_user("7", "Maryam").await.unwrap();
        assert_eq!(user.display_name, "Maryam");
    }

    #[test]
    fn test_concurrent_marks_keep_every_flag() {
        let store = Arc::new(MemoryStore::new());
        let record = tokio_test::block_on(async {
            let mut handles = Vec::new();
            for activity in Activity::ALL {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    store.mark_complete("42", activity.key()).await
                }));
            }
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
            store.today_status("42").await.unwrap()
        });
        assert_eq!(record.completion_percentage(), 100);
    }

    #[tokio::test]
    async fn test_record_lookup_does_not_create() {
        let store = MemoryStore::new();
        assert!(store.record_for_date("ghost", day(1)).await.unwrap().is_none());
        assert_eq!(store.user_count().await, 0);
    }
}
