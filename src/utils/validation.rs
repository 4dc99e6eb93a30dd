use anyhow::{anyhow, Result};

/// Longest display name kept for a user, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Trims the name, drops control characters and caps its length.
/// An empty result is allowed; replies fall back to a generic greeting.
pub fn normalize_display_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_DISPLAY_NAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub fn validate_database_url(url: &str) -> Result<()> {
    let url = url.trim();

    if url.is_empty() {
        return Err(anyhow!("Database URL cannot be empty"));
    }

    if !url.starts_with("sqlite:") {
        return Err(anyhow!("Only sqlite: database URLs are supported"));
    }

    Ok(())
}

pub fn validate_timeout_secs(secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(anyhow!("Storage timeout must be at least 1 second"));
    }

    if secs > 300 {
        return Err(anyhow!("Storage timeout cannot exceed 300 seconds"));
    }

    Ok(())
}
