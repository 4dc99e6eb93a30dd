use serde::{Deserialize, Serialize};
use std::fmt;

use super::Activity;
use crate::error::UserError;

/// Longest cycle length accepted by [`Settings::apply`].
pub const MAX_CYCLE_DAYS: u32 = 60;

/// When a prayer notification should fire relative to the prayer time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationTiming {
    #[default]
    Exact,
    #[serde(alias = "5min")]
    Minus5,
    #[serde(alias = "10min")]
    Minus10,
}

impl NotificationTiming {
    pub fn minutes_before(self) -> u32 {
        match self {
            NotificationTiming::Exact => 0,
            NotificationTiming::Minus5 => 5,
            NotificationTiming::Minus10 => 10,
        }
    }
}

impl fmt::Display for NotificationTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTiming::Exact => f.write_str("at prayer time"),
            other => write!(f, "{} minutes before", other.minutes_before()),
        }
    }
}

/// Per-user notification and cycle preferences.
///
/// Stored as a JSON blob. Every field falls back to its default when absent,
/// so callers always see a fully populated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub notify_fajr: bool,
    pub notify_zuhr: bool,
    pub notify_asr: bool,
    pub notify_maghrib: bool,
    pub notify_isha: bool,
    #[serde(alias = "notificationTime")]
    pub notification_timing: NotificationTiming,
    pub menstruation_days: u32,
    pub cycle_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notify_fajr: true,
            notify_zuhr: true,
            notify_asr: true,
            notify_maghrib: true,
            notify_isha: true,
            notification_timing: NotificationTiming::Exact,
            menstruation_days: 5,
            cycle_days: 28,
        }
    }
}

impl Settings {
    /// Parses a stored blob. A missing or empty blob yields the defaults.
    pub fn from_json(raw: Option<&str>) -> Result<Self, serde_json::Error> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => serde_json::from_str(json),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Notification flag for a prayer; `None` for non-prayer activities.
    pub fn notifies(&self, activity: Activity) -> Option<bool> {
        match activity {
            Activity::Fajr => Some(self.notify_fajr),
            Activity::Zuhr => Some(self.notify_zuhr),
            Activity::Asr => Some(self.notify_asr),
            Activity::Maghrib => Some(self.notify_maghrib),
            Activity::Isha => Some(self.notify_isha),
            Activity::Dhikr | Activity::Quran => None,
        }
    }

    /// Returns a copy with `patch` applied, rejecting inconsistent cycle values.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Self, UserError> {
        let mut next = self.clone();
        if let Some(v) = patch.notify_fajr {
            next.notify_fajr = v;
        }
        if let Some(v) = patch.notify_zuhr {
            next.notify_zuhr = v;
        }
        if let Some(v) = patch.notify_asr {
            next.notify_asr = v;
        }
        if let Some(v) = patch.notify_maghrib {
            next.notify_maghrib = v;
        }
        if let Some(v) = patch.notify_isha {
            next.notify_isha = v;
        }
        if let Some(v) = patch.notification_timing {
            next.notification_timing = v;
        }
        if let Some(v) = patch.menstruation_days {
            next.menstruation_days = v;
        }
        if let Some(v) = patch.cycle_days {
            next.cycle_days = v;
        }

        if next.cycle_days > MAX_CYCLE_DAYS {
            return Err(UserError::InvalidSettings(format!(
                "cycle length cannot exceed {MAX_CYCLE_DAYS} days"
            )));
        }
        if next.menstruation_days > next.cycle_days {
            return Err(UserError::InvalidSettings(
                "menstruation days cannot exceed the cycle length".to_string(),
            ));
        }
        Ok(next)
    }
}

/// Partial settings update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub notify_fajr: Option<bool>,
    pub notify_zuhr: Option<bool>,
    pub notify_asr: Option<bool>,
    pub notify_maghrib: Option<bool>,
    pub notify_isha: Option<bool>,
    pub notification_timing: Option<NotificationTiming>,
    pub menstruation_days: Option<u32>,
    pub cycle_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.notify_fajr && s.notify_zuhr && s.notify_asr && s.notify_maghrib && s.notify_isha);
        assert_eq!(s.notification_timing, NotificationTiming::Exact);
        assert_eq!(s.menstruation_days, 5);
        assert_eq!(s.cycle_days, 28);
    }

    #[test]
    fn test_missing_blob_reads_as_defaults() {
        assert_eq!(Settings::from_json(None).unwrap(), Settings::default());
        assert_eq!(Settings::from_json(Some("  ")).unwrap(), Settings::default());
        assert_eq!(Settings::from_json(Some("{}")).unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_blob_is_filled_with_defaults() {
        let s = Settings::from_json(Some(r#"{"notifyAsr":false,"cycleDays":30}"#)).unwrap();
        assert!(!s.notify_asr);
        assert!(s.notify_fajr);
        assert_eq!(s.cycle_days, 30);
        assert_eq!(s.menstruation_days, 5);
    }

    #[test]
    fn test_legacy_timing_spelling() {
        let s = Settings::from_json(Some(r#"{"notificationTime":"10min"}"#)).unwrap();
        assert_eq!(s.notification_timing, NotificationTiming::Minus10);

        let json = s.to_json().unwrap();
        assert!(json.contains(r#""notificationTiming":"minus10""#));
    }

    #[test]
    fn test_apply_patch() {
        let patch = SettingsPatch {
            notify_isha: Some(false),
            notification_timing: Some(NotificationTiming::Minus5),
            ..Default::default()
        };
        let s = Settings::default().apply(&patch).unwrap();
        assert!(!s.notify_isha);
        assert_eq!(s.notification_timing.minutes_before(), 5);
        assert_eq!(s.cycle_days, 28);
    }

    #[test]
    fn test_apply_rejects_inconsistent_cycle() {
        let too_long = SettingsPatch { menstruation_days: Some(30), ..Default::default() };
        assert!(matches!(
            Settings::default().apply(&too_long),
            Err(UserError::InvalidSettings(_))
        ));

        let huge_cycle = SettingsPatch { cycle_days: Some(90), ..Default::default() };
        assert!(Settings::default().apply(&huge_cycle).is_err());
    }

    #[test]
    fn test_notifies_only_for_prayers() {
        let s = Settings { notify_maghrib: false, ..Settings::default() };
        assert_eq!(s.notifies(Activity::Maghrib), Some(false));
        assert_eq!(s.notifies(Activity::Fajr), Some(true));
        assert_eq!(s.notifies(Activity::Quran), None);
    }
}
