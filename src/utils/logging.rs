//! Single-line log formats shared by the bot, the stores and `main`.
//!
//! Every line starts with a fixed tag (`CMD_START`, `DB_OP`, ...) so logs can
//! be grepped per concern. Users are written as `name(id)`.

use tracing::{debug, error, info, warn};

fn suffix(details: Option<&str>) -> String {
    details.map(|d| format!(" - {d}")).unwrap_or_default()
}

/// A command was received. `details` carries its argument, if any.
pub fn log_command_start(command: &str, user: &str, user_id: &str, details: Option<&str>) {
    info!("CMD_START: {} by {}({}){}", command, user, user_id, suffix(details));
}

/// A command produced a reply. `details` summarizes the outcome.
pub fn log_command_success(command: &str, user: &str, user_id: &str, details: Option<&str>) {
    info!("CMD_SUCCESS: {} by {}({}){}", command, user, user_id, suffix(details));
}

pub fn log_command_error(command: &str, user: &str, user_id: &str, error: &str) {
    error!("CMD_ERROR: {} by {}({}) - {}", command, user, user_id, error);
}

pub fn log_validation_error(command: &str, field: &str, value: &str, error: &str, user: &str, user_id: &str) {
    warn!(
        "VALIDATION_ERROR: {} - {} '{}' rejected: {} - user {}({})",
        command, field, value, error, user, user_id
    );
}

pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    debug!("DB_OP: {} on {}{}", operation, table, suffix(details));
}

pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    error!("DB_ERROR: {} on {} failed: {}{}", operation, table, error, suffix(details));
}

pub fn log_timeout(operation: &str, duration_secs: u64, details: Option<&str>) {
    warn!("TIMEOUT: {} after {}s{}", operation, duration_secs, suffix(details));
}

pub fn log_system_event(event: &str, details: Option<&str>) {
    info!("SYSTEM: {}{}", event, suffix(details));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix() {
        assert_eq!(suffix(None), "");
        assert_eq!(suffix(Some("fajr")), " - fajr");
    }
}
