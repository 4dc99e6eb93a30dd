use std::time::Duration;
use thiserror::Error;

use crate::database::models::{Activity, CyclePhase};

/// Failures of the persistence layer. These are never recovered locally;
/// the transport decides whether to retry.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("stored settings are corrupt: {0}")]
    CorruptSettings(#[from] serde_json::Error),

    #[error("storage operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Problems caused by what the user typed. Reported back as a reply, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    /// `done` was called without a key or with a key outside the fixed set.
    #[error("{}", invalid_activity_message(.input))]
    InvalidActivity { input: Option<String> },

    #[error("unknown cycle phase '{input}', expected one of: {}", phase_keys())]
    InvalidPhase { input: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Errors surfaced by tracker operations that validate input.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn invalid_activity_message(input: &Option<String>) -> String {
    let valid = Activity::ALL
        .iter()
        .map(|a| a.key())
        .collect::<Vec<_>>()
        .join(", ");
    match input {
        Some(key) => format!("unknown activity '{key}', expected one of: {valid}"),
        None => format!("missing activity, expected one of: {valid}"),
    }
}

fn phase_keys() -> String {
    CyclePhase::ALL.iter().map(|p| p.key()).collect::<Vec<_>>().join(", ")
}

pub type StorageResult<T> = Result<T, StorageError>;
pub type TrackerResult<T> = Result<T, TrackerError>;
