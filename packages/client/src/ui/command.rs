//! Prompt command parsing.

use std::str::FromStr;

use thiserror::Error;

use crate::domain::TimerMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetSelfId(String),
    SetPartnerId(String),
    Disconnect,
    Logout,
    Start,
    Pause,
    Stop,
    Mode(TimerMode),
    Settings {
        focus_minutes: u32,
        break_minutes: u32,
    },
    Status,
    Log,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (type 'help' for a list)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{value}' is not a number of minutes")]
    InvalidMinutes { value: String },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name.to_lowercase().as_str(), args.as_slice()) {
            ("id", [id]) => Self::SetSelfId(id.to_string()),
            ("id", _) => return Err(CommandError::Usage("id <your-id>")),
            ("partner", [id]) => Self::SetPartnerId(id.to_string()),
            ("partner", _) => return Err(CommandError::Usage("partner <partner-id>")),
            ("disconnect", []) => Self::Disconnect,
            ("logout", []) => Self::Logout,
            ("start", []) => Self::Start,
            ("pause", []) => Self::Pause,
            ("stop", []) => Self::Stop,
            ("mode", [mode]) => match mode.to_lowercase().as_str() {
                "focus" => Self::Mode(TimerMode::Focus),
                "break" => Self::Mode(TimerMode::Break),
                _ => return Err(CommandError::Usage("mode focus|break")),
            },
            ("mode", _) => return Err(CommandError::Usage("mode focus|break")),
            ("settings", [focus, brk]) => Self::Settings {
                focus_minutes: parse_minutes(focus)?,
                break_minutes: parse_minutes(brk)?,
            },
            ("settings", _) => {
                return Err(CommandError::Usage("settings <focus-minutes> <break-minutes>"));
            }
            ("status", []) => Self::Status,
            ("log", []) => Self::Log,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

fn parse_minutes(raw: &str) -> Result<u32, CommandError> {
    raw.parse().map_err(|_| CommandError::InvalidMinutes {
        value: raw.to_string(),
    })
}
