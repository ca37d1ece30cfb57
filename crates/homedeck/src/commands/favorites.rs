//! Favorites command handlers.

use tabled::Tabled;

use homedeck_core::{Entity, FavoriteToggle};

use crate::cli::{FavoritesArgs, FavoritesCommand, GlobalOpts, OutputFormat};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FavoriteRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&Entity> for FavoriteRow {
    fn from(e: &Entity) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            name: e.friendly_name.clone(),
            state: e.state.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(session: &Session, args: FavoritesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let companion = &session.companion;

    match args.command {
        FavoritesCommand::List => {
            let favorites = companion.favorites()?;
            if favorites.is_empty() && matches!(global.output, OutputFormat::Table) {
                if !global.quiet {
                    eprintln!("No favorites yet. Run: homedeck favorites add <entity-id>");
                }
                return Ok(());
            }
            let out = output::render_list(&global.output, &favorites, |e| FavoriteRow::from(e), |e| {
                e.entity_id.clone()
            });
            output::print_output(&out, global.quiet);
            util::offline_notice(companion, global.quiet);
            Ok(())
        }

        FavoritesCommand::Add { entity_id } => {
            util::require_cached(companion, &entity_id)?;
            companion.add_favorite(&entity_id)?;
            if !global.quiet {
                eprintln!("Added {entity_id} to favorites");
            }
            Ok(())
        }

        FavoritesCommand::Remove { entity_id } => {
            companion.remove_favorite(&entity_id)?;
            if !global.quiet {
                eprintln!("Removed {entity_id} from favorites");
            }
            Ok(())
        }

        FavoritesCommand::Toggle { entity_id } => {
            util::require_cached(companion, &entity_id)?;
            let flipped = companion.toggle_favorite(&entity_id)?;
            if !global.quiet {
                match flipped {
                    FavoriteToggle::Added => eprintln!("{entity_id} is now a favorite"),
                    FavoriteToggle::Removed => eprintln!("{entity_id} is no longer a favorite"),
                }
            }
            Ok(())
        }
    }
}
