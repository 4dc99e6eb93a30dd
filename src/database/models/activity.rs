use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UserError;

/// One of the seven trackable daily acts of worship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Fajr,
    Zuhr,
    Asr,
    Maghrib,
    Isha,
    Dhikr,
    Quran,
}

impl Activity {
    /// All activities in display order.
    pub const ALL: [Activity; 7] = [
        Activity::Fajr,
        Activity::Zuhr,
        Activity::Asr,
        Activity::Maghrib,
        Activity::Isha,
        Activity::Dhikr,
        Activity::Quran,
    ];

    /// The five obligatory prayers.
    pub const PRAYERS: [Activity; 5] = [
        Activity::Fajr,
        Activity::Zuhr,
        Activity::Asr,
        Activity::Maghrib,
        Activity::Isha,
    ];

    /// Lowercase key, also used as the column name in `daily_records`.
    pub fn key(self) -> &'static str {
        match self {
            Activity::Fajr => "fajr",
            Activity::Zuhr => "zuhr",
            Activity::Asr => "asr",
            Activity::Maghrib => "maghrib",
            Activity::Isha => "isha",
            Activity::Dhikr => "dhikr",
            Activity::Quran => "quran",
        }
    }

    pub fn is_prayer(self) -> bool {
        Activity::PRAYERS.contains(&self)
    }

    /// Capitalized name for replies.
    pub fn label(self) -> &'static str {
        match self {
            Activity::Fajr => "Fajr",
            Activity::Zuhr => "Zuhr",
            Activity::Asr => "Asr",
            Activity::Maghrib => "Maghrib",
            Activity::Isha => "Isha",
            Activity::Dhikr => "Dhikr",
            Activity::Quran => "Quran",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Activity {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Activity::ALL
            .into_iter()
            .find(|a| a.key() == normalized)
            .ok_or_else(|| UserError::InvalidActivity {
                input: Some(s.trim().to_string()),
            })
    }
}
