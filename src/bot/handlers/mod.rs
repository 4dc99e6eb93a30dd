pub mod message;

use teloxide::{dispatching::UpdateHandler, prelude::*, types::Me};

use crate::bot::dispatcher::CommandDispatcher;

pub struct BotHandler {
    pub dispatcher: CommandDispatcher,
}

impl BotHandler {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Every text message goes through the same endpoint. Commands are parsed
    /// by [`crate::bot::commands::Input::parse`] against the bot's own
    /// username, which the teloxide dispatcher injects as `Me`.
    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let dispatcher = self.dispatcher.clone();

        Update::filter_message()
            .filter(|msg: Message| msg.text().is_some())
            .endpoint(move |bot: Bot, msg: Message, me: Me| {
                let dispatcher = dispatcher.clone();
                async move { message::message_handler(bot, msg, me, dispatcher).await }
            })
    }
}
