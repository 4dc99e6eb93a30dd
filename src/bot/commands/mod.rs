use teloxide::utils::command::{BotCommands, ParseError};

/// Commands advertised to Telegram, listed by `/help`, and used to parse
/// every inbound command.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "MunaLuna tracker commands:")]
pub enum Command {
    #[command(description = "Start using the bot")]
    Start,
    #[command(description = "Show today's worship status")]
    Status,
    #[command(description = "Mark an activity as done, e.g. /done fajr")]
    Done(String),
    #[command(description = "Show your notification and cycle settings")]
    Settings,
    #[command(description = "Show your cycle phase; /cycle start begins a new cycle, /cycle <phase> corrects today")]
    Cycle(String),
    #[command(description = "Display this help message")]
    Help,
}

/// Marker that distinguishes commands from free text.
pub const COMMAND_MARKER: char = '/';

/// Argument of `/cycle` that begins a new cycle today.
pub const CYCLE_START: &str = "start";

/// An inbound message with at most one argument token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Status,
    Done(Option<String>),
    Settings,
    Cycle(Option<String>),
    Help,
    /// A command-looking message whose verb is not recognized.
    Unknown(String),
    /// Anything without the command marker.
    Text(String),
}

impl Input {
    /// Parses `text` addressed to the bot called `bot_name`. Returns `None`
    /// for commands addressed to a different bot.
    pub fn parse(text: &str, bot_name: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with(COMMAND_MARKER) {
            return Some(Input::Text(trimmed.to_string()));
        }

        match Command::parse(trimmed, bot_name) {
            Ok(command) => Some(command.into()),
            Err(ParseError::WrongBotName(name)) => {
                tracing::debug!("Ignoring command addressed to @{}", name);
                None
            }
            Err(_) => {
                let verb = trimmed.split_whitespace().next().unwrap_or(trimmed);
                Some(Input::Unknown(verb.to_string()))
            }
        }
    }

    /// Verb used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Input::Start => "start",
            Input::Status => "status",
            Input::Done(_) => "done",
            Input::Settings => "settings",
            Input::Cycle(_) => "cycle",
            Input::Help => "help",
            Input::Unknown(_) => "unknown",
            Input::Text(_) => "text",
        }
    }

    /// The argument token, if the command carries one.
    pub fn argument(&self) -> Option<&str> {
        match self {
            Input::Done(arg) | Input::Cycle(arg) => arg.as_deref(),
            _ => None,
        }
    }
}

impl From<Command> for Input {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => Input::Start,
            Command::Status => Input::Status,
            Command::Done(arg) => Input::Done(first_token(&arg)),
            Command::Settings => Input::Settings,
            Command::Cycle(arg) => Input::Cycle(first_token(&arg)),
            Command::Help => Input::Help,
        }
    }
}

fn first_token(arg: &str) -> Option<String> {
    arg.split_whitespace().next().map(str::to_string)
}
