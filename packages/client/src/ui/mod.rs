//! Terminal UI: command parsing, output formatting and the interactive session.

pub mod command;
pub mod formatter;
pub mod session;

pub use command::{Command, CommandError};
pub use formatter::StatusFormatter;
pub use session::run_session;
