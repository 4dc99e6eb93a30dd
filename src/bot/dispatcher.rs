use std::sync::Arc;

use crate::bot::commands::{Input, CYCLE_START};
use crate::database::models::{Activity, CycleDay, CycleOverview, CyclePhase, DailyRecord, Settings};
use crate::error::{StorageResult, UserError};
use crate::store::TrackerStore;
use crate::utils::logging::{
    log_command_error, log_command_start, log_command_success, log_validation_error,
};

/// Today's record with its derived completion figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub record: DailyRecord,
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl From<DailyRecord> for StatusSnapshot {
    fn from(record: DailyRecord) -> Self {
        Self {
            completed: record.completed_count(),
            total: record.total(),
            percentage: record.completion_percentage(),
            record,
        }
    }
}

/// What the transport should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Greeting { user_name: String },
    Status(StatusSnapshot),
    DoneAck { activity: Activity, snapshot: StatusSnapshot },
    Settings(Settings),
    Cycle(CycleOverview),
    CycleStarted { days: usize, overview: CycleOverview },
    PhaseSet(CycleDay),
    Help,
    Echo(String),
    Error(UserError),
}

impl Reply {
    /// Short outcome for the CMD_SUCCESS log line.
    fn summary(&self) -> Option<String> {
        match self {
            Reply::Status(s) => Some(format!("{}/{} done", s.completed, s.total)),
            Reply::DoneAck { activity, snapshot } => {
                Some(format!("{} -> {}%", activity.key(), snapshot.percentage))
            }
            Reply::Cycle(overview) => overview.current.map(|s| s.phase.key().to_string()),
            Reply::CycleStarted { days, .. } => Some(format!("{days} days planned")),
            Reply::PhaseSet(day) => Some(format!("{} is {}", day.date, day.phase)),
            _ => None,
        }
    }
}

/// Maps parsed input to store calls. Holds no state of its own.
#[derive(Clone)]
pub struct CommandDispatcher {
    store: Arc<dyn TrackerStore>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }

    /// Handles one command. Only storage failures are returned as `Err`.
    pub async fn dispatch(&self, user_id: &str, display_name: &str, input: Input) -> StorageResult<Reply> {
        let command = input.name();
        log_command_start(command, display_name, user_id, input.argument());

        let result = self.run(user_id, display_name, input).await;
        match &result {
            Ok(Reply::Error(e)) => log_command_error(command, display_name, user_id, &e.to_string()),
            Ok(reply) => log_command_success(command, display_name, user_id, reply.summary().as_deref()),
            Err(e) => log_command_error(command, display_name, user_id, &e.to_string()),
        }
        result
    }

    async fn run(&self, user_id: &str, display_name: &str, input: Input) -> StorageResult<Reply> {
        match input {
            Input::Start => {
                let user = self.store.ensure_user(user_id, display_name).await?;
                Ok(Reply::Greeting { user_name: user.display_name })
            }
            Input::Status => {
                self.store.ensure_user(user_id, display_name).await?;
                let record = self.store.today_status(user_id).await?;
                Ok(Reply::Status(record.into()))
            }
            Input::Done(argument) => {
                self.store.ensure_user(user_id, display_name).await?;
                self.done(user_id, display_name, argument).await
            }
            Input::Settings => {
                self.store.ensure_user(user_id, display_name).await?;
                let settings = self.store.settings(user_id).await?;
                Ok(Reply::Settings(settings))
            }
            Input::Cycle(argument) => {
                self.store.ensure_user(user_id, display_name).await?;
                self.cycle(user_id, display_name, argument).await
            }
            Input::Help => Ok(Reply::Help),
            Input::Unknown(verb) => Ok(Reply::Error(UserError::UnknownCommand(verb))),
            Input::Text(text) => Ok(Reply::Echo(text)),
        }
    }

    async fn done(&self, user_id: &str, display_name: &str, argument: Option<String>) -> StorageResult<Reply> {
        let Some(key) = argument else {
            log_validation_error("done", "activity", "", "missing", display_name, user_id);
            return Ok(Reply::Error(UserError::InvalidActivity { input: None }));
        };

        let activity = match key.parse::<Activity>() {
            Ok(activity) => activity,
            Err(e) => {
                log_validation_error("done", "activity", &key, &e.to_string(), display_name, user_id);
                return Ok(Reply::Error(e));
            }
        };

        let record = self.store.mark_activity(user_id, activity).await?;
        Ok(Reply::DoneAck { activity, snapshot: record.into() })
    }

    async fn cycle(&self, user_id: &str, display_name: &str, argument: Option<String>) -> StorageResult<Reply> {
        let today = self.store.today();

        let Some(arg) = argument else {
            let days = self.store.cycle_days(user_id).await?;
            return Ok(Reply::Cycle(CycleOverview::new(&days, today)));
        };

        if arg.eq_ignore_ascii_case(CYCLE_START) {
            let plan = self.store.start_cycle(user_id, today).await?;
            return Ok(Reply::CycleStarted {
                days: plan.len(),
                overview: CycleOverview::new(&plan, today),
            });
        }

        match arg.parse::<CyclePhase>() {
            Ok(phase) => Ok(Reply::PhaseSet(self.store.set_phase(user_id, today, phase).await?)),
            Err(e) => {
                log_validation_error("cycle", "phase", &arg, &e.to_string(), display_name, user_id);
                Ok(Reply::Error(e))
            }
        }
    }
}
