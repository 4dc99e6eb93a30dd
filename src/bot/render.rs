use teloxide::utils::command::BotCommands;

use crate::bot::commands::Command;
use crate::bot::dispatcher::{Reply, StatusSnapshot};
use crate::database::models::{Activity, CycleDay, CycleOverview, Settings};
use crate::error::UserError;
use crate::utils::datetime::format_date;
use crate::utils::markdown::{bold, checkbox, escape_markdown};

/// Renders a reply as MarkdownV2 text.
pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Greeting { user_name } => render_greeting(user_name),
        Reply::Status(snapshot) => render_status(snapshot),
        Reply::DoneAck { activity, snapshot } => format!(
            "✅ {} marked as done\\!\n🎯 Today's progress: {}/{} \\({}%\\)",
            bold(activity.label()),
            snapshot.completed,
            snapshot.total,
            snapshot.percentage
        ),
        Reply::Settings(settings) => render_settings(settings),
        Reply::Cycle(overview) => render_cycle(overview),
        Reply::CycleStarted { days, overview } => format!(
            "🌙 New cycle started, {} days planned\\.\n\n{}",
            days,
            render_cycle(overview)
        ),
        Reply::PhaseSet(day) => render_phase_set(day),
        Reply::Help => render_help(),
        Reply::Echo(text) => format!(
            "I received your message: {}\nUse /help to see the available commands\\.",
            escape_markdown(text)
        ),
        Reply::Error(error) => render_error(error),
    }
}

/// Sent when the store fails; the next message is handled normally.
pub fn render_storage_failure() -> String {
    escape_markdown("❌ Something went wrong while saving your progress. Please try again in a moment.")
}

fn render_greeting(user_name: &str) -> String {
    let name = if user_name.trim().is_empty() { "friend" } else { user_name };
    format!(
        "Assalamu alaikum, {}\\!\n\n\
        MunaLuna is your personal worship tracker\\.\n\n\
        /status \\- today's progress\n\
        /done \\[activity\\] \\- mark an activity as done\n\
        /settings \\- notification settings\n\
        /cycle \\- your cycle phase\n\
        /help \\- all commands",
        bold(name)
    )
}

fn render_status(snapshot: &StatusSnapshot) -> String {
    let record = &snapshot.record;
    let mut text = format!(
        "📊 {} \\({}\\)\n\n🕋 {}\n",
        bold("Today's worship"),
        escape_markdown(&format_date(record.date)),
        bold("Prayers")
    );
    for prayer in Activity::PRAYERS {
        text.push_str(&format!("{} {}\n", checkbox(record.get(prayer)), prayer.label()));
    }
    text.push_str(&format!("\n📿 {}\n", bold("Additional")));
    for extra in Activity::ALL.into_iter().filter(|a| !a.is_prayer()) {
        text.push_str(&format!("{} {}\n", checkbox(record.get(extra)), extra.label()));
    }
    text.push_str(&format!(
        "\n{}: {}% complete ⭐️",
        bold("Progress"),
        snapshot.percentage
    ));
    let pending = record.pending();
    if !pending.is_empty() {
        let keys = pending.iter().map(|a| a.key()).collect::<Vec<_>>().join(", ");
        text.push_str(&format!("\nStill to do: {}", escape_markdown(&keys)));
    }
    text
}

fn render_cycle(overview: &CycleOverview) -> String {
    if overview.is_empty() {
        return escape_markdown("🌙 No cycle recorded yet. Use /cycle start on the first day of your period.");
    }
    let mut text = format!("🌙 {}\n\n", bold("Your cycle"));
    match overview.current {
        Some(span) => text.push_str(&format!(
            "Today: {} \\(since {}\\)\n",
            bold(span.phase.label()),
            escape_markdown(&format_date(span.start))
        )),
        None => text.push_str("Today: no phase recorded\n"),
    }
    if let Some(next) = overview.next {
        text.push_str(&format!(
            "Next: {} from {}\n",
            bold(next.phase.label()),
            escape_markdown(&format_date(next.start))
        ));
    }
    text
}

fn render_phase_set(day: &CycleDay) -> String {
    format!(
        "✅ {} marked as {}",
        escape_markdown(&format_date(day.date)),
        bold(day.phase.label())
    )
}

fn render_settings(settings: &Settings) -> String {
    let mut text = format!("⚙️ {}\n\n🔔 {}\n", bold("Your settings"), bold("Notifications"));
    for prayer in Activity::PRAYERS {
        let on = settings.notifies(prayer).unwrap_or(false);
        text.push_str(&format!("{} {}\n", if on { "✅" } else { "❌" }, prayer.label()));
    }
    text.push_str(&format!(
        "\n⏰ {}: {}\n\n🔄 {}\n📅 Menstruation days: {}\n⏱️ Cycle length: {} days\n",
        bold("Notification time"),
        escape_markdown(&settings.notification_timing.to_string()),
        bold("Cycle"),
        settings.menstruation_days,
        settings.cycle_days
    ));
    text
}

fn render_help() -> String {
    let keys = Activity::ALL.iter().map(|a| a.key()).collect::<Vec<_>>().join(", ");
    format!(
        "{}\n\n{}: {}",
        escape_markdown(&Command::descriptions().to_string()),
        bold("Activities"),
        escape_markdown(&keys)
    )
}

fn render_error(error: &UserError) -> String {
    let keys = Activity::ALL.iter().map(|a| a.key()).collect::<Vec<_>>().join(", ");
    let text = match error {
        UserError::InvalidActivity { input: None } => format!(
            "Please say which activity you completed, e.g. /done fajr or /done quran.\nAvailable: {keys}"
        ),
        UserError::InvalidActivity { input: Some(key) } => {
            format!("Unknown activity: {key}\nAvailable: {keys}")
        }
        UserError::InvalidPhase { input } => format!(
            "Unknown cycle phase: {input}\nUse /cycle start, or one of: menstruation, clean, ovulation"
        ),
        UserError::InvalidSettings(reason) => format!("These settings can't be saved: {reason}"),
        UserError::UnknownCommand(_) => {
            "Unknown command. Use /help to see the available commands.".to_string()
        }
    };
    escape_markdown(&text)
}
