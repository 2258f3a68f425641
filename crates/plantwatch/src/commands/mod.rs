//! Command dispatch: bridges CLI args -> monitor operations -> output.

pub mod config_cmd;
pub mod status;
pub mod topics;
pub mod watch;

use plantwatch_core::Monitor;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a broker-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, monitor: &Monitor, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(monitor, args, global).await,
        Command::Status(args) => status::handle(monitor, args, global).await,
        // Topics, Config and Completions are handled before dispatch
        Command::Topics | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
