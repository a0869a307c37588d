// PulseWatch - Operator Console Commands
//
// Parses one line into a `Command` and applies it to the step counter, the
// time store, or the state register. Parsing never mutates anything, so a
// malformed argument leaves all state untouched.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveTime;
use thiserror::Error;

use crate::steps::StepCounter;
use crate::time_store::TimeStore;

pub const HELP_TEXT: &str = "Available commands:
help - Show this help message
reset-steps - Reset step counter
steps - Show current step count
time - Show current time
settime HH:MM:SS - Set time of day
workout on|off - Enter or leave workout mode
status - Show steps, mode and time
quit - Stop the watch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    ResetSteps,
    Steps,
    Time,
    SetTime(NaiveTime),
    Workout(bool),
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command. Type 'help' for options")]
    Unknown(String),

    #[error("Invalid time '{0}'. Usage: settime HH:MM:SS")]
    InvalidTime(String),

    #[error("Usage: workout on|off")]
    InvalidWorkout,

    #[error("'{0}' takes no arguments")]
    UnexpectedArgument(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let bare = |cmd: Command, name: &'static str| {
            if rest.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::UnexpectedArgument(name))
            }
        };

        match name {
            "help" => bare(Command::Help, "help"),
            "reset-steps" => bare(Command::ResetSteps, "reset-steps"),
            "steps" => bare(Command::Steps, "steps"),
            "time" => bare(Command::Time, "time"),
            "status" => bare(Command::Status, "status"),
            "quit" | "exit" => bare(Command::Quit, "quit"),
            "settime" => parse_time_of_day(rest).map(Command::SetTime),
            "workout" => match rest {
                "on" => Ok(Command::Workout(true)),
                "off" => Ok(Command::Workout(false)),
                _ => Err(CommandError::InvalidWorkout),
            },
            _ => Err(CommandError::Unknown(line.to_owned())),
        }
    }
}

fn parse_time_of_day(arg: &str) -> Result<NaiveTime, CommandError> {
    NaiveTime::parse_from_str(arg, "%H:%M:%S").map_err(|_| CommandError::InvalidTime(arg.to_owned()))
}

/// Result of one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub quit: bool,
}

impl Response {
    fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), quit: false }
    }
}

pub struct Console {
    steps: Arc<StepCounter>,
    time: Arc<TimeStore>,
}

impl Console {
    pub fn new(steps: Arc<StepCounter>, time: Arc<TimeStore>) -> Self {
        Self { steps, time }
    }

    /// `None` for a blank line.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        if line.trim().is_empty() {
            return None;
        }
        Some(match line.parse::<Command>() {
            Ok(cmd) => self.execute(cmd),
            Err(e) => Response::text(e.to_string()),
        })
    }

    pub fn execute(&self, cmd: Command) -> Response {
        let state = self.steps.state();
        match cmd {
            Command::Help => Response::text(HELP_TEXT),
            Command::ResetSteps => {
                self.steps.reset_steps();
                Response::text("Steps reset to 0")
            }
            Command::Steps => Response::text(format!("Steps: {}", self.steps.get_steps())),
            Command::Time => Response::text(format!("Current: {}", self.time.get_current_time())),
            Command::SetTime(time) => {
                let value = self.time.set_time_of_day(time);
                Response::text(format!("Time set to {}", value))
            }
            Command::Workout(active) => {
                state.set_workout(active);
                log::warn!("Workout mode {}", if active { "activated" } else { "deactivated" });
                Response::text(format!("Workout mode {}", if active { "on" } else { "off" }))
            }
            Command::Status => Response::text(format!(
                "Steps: {} | Workout: {} | Time: {}",
                self.steps.get_steps(),
                if state.workout_active() { "on" } else { "off" },
                self.time.peek(),
            )),
            Command::Quit => Response { text: "Shutting down".into(), quit: true },
        }
    }
}
