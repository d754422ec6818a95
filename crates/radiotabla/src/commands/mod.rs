//! Command dispatch: bridges CLI args -> coordinator -> output formatting.

pub mod channels;
pub mod config_cmd;
pub mod refresh;
pub mod schedule;
pub mod util;
pub mod watch;

use crate::cli::Command;
use crate::config::Settings;
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, settings: &Settings) -> Result<(), CliError> {
    match cmd {
        Command::Channels(args) => channels::handle(args, settings).await,
        Command::Schedule(args) => schedule::handle(args, settings).await,
        Command::Watch(args) => watch::handle(args, settings).await,
        Command::Refresh(args) => refresh::handle(args, settings).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
