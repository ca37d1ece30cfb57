//! Sync command handler.

use homedeck_core::SyncOutcome;

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, force: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let companion = &session.companion;

    // Without a hub the staleness check would report "fresh" forever;
    // an explicit sync request deserves the real answer.
    if session.hub_url.is_none() {
        return Err(CliError::NoHub);
    }

    let outcome = if force {
        SyncOutcome::Synced(companion.sync().await?)
    } else {
        companion.sync_if_needed().await?
    };

    if !global.quiet {
        match outcome {
            SyncOutcome::Synced(count) => eprintln!("Synced {count} entities from the hub"),
            SyncOutcome::Skipped => eprintln!(
                "Cache is fresh (last sync: {}); use --force to sync anyway",
                output::format_age(companion.last_sync())
            ),
        }
    }
    Ok(())
}
