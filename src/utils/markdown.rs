//! Telegram MarkdownV2 helpers.
//!
//! MarkdownV2 rejects messages containing unescaped reserved characters, so
//! every piece of user-supplied or computed text goes through
//! [`escape_markdown`] before it is embedded in a reply.

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escapes markdown special characters for MarkdownV2 parsing mode
///
/// # Example
/// ```
/// use munaluna_tracker_bot::utils::markdown::escape_markdown;
///
/// let escaped = escape_markdown("Fajr (done)!");
/// assert_eq!(escaped, "Fajr \\(done\\)\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escaped text wrapped in bold markers.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}

pub fn checkbox(done: bool) -> &'static str {
    if done { "✅" } else { "⬜️" }
}
