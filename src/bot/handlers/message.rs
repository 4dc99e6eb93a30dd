use teloxide::prelude::*;
use teloxide::types::{Me, ParseMode};

use crate::bot::commands::Input;
use crate::bot::dispatcher::CommandDispatcher;
use crate::bot::render::{render_reply, render_storage_failure};
use crate::utils::validation::normalize_display_name;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    me: Me,
    dispatcher: CommandDispatcher,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from() else {
        tracing::debug!("Ignoring message without sender in chat {}", msg.chat.id);
        return Ok(());
    };

    let user_id = user.id.0.to_string();
    let display_name = normalize_display_name(&user.first_name);
    let Some(input) = Input::parse(text, me.username()) else {
        return Ok(());
    };

    let reply_text = match dispatcher.dispatch(&user_id, &display_name, input).await {
        Ok(reply) => render_reply(&reply),
        Err(e) => {
            tracing::error!("Storage failure for user {}: {}", user_id, e);
            render_storage_failure()
        }
    };

    bot.send_message(msg.chat.id, reply_text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;

    Ok(())
}
