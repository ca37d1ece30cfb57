//! Command dispatch: bridges CLI args -> facade calls -> output formatting.

pub mod call;
pub mod config_cmd;
pub mod entities;
pub mod favorites;
pub mod status;
pub mod sync_cmd;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(session, global).await,
        Command::Sync { force } => sync_cmd::handle(session, force, global).await,
        Command::List(args) => entities::list(session, &args, global),
        Command::Show { entity_id, refresh } => {
            entities::show(session, &entity_id, refresh, global).await
        }
        Command::Favorites(args) => favorites::handle(session, args, global),
        Command::Call(args) => call::handle(session, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
