//! Entity list and detail handlers.

use tabled::Tabled;

use homedeck_core::{Entity, Refreshed};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Area")]
    area: String,
}

impl From<&Entity> for EntityRow {
    fn from(e: &Entity) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            name: e.friendly_name.clone(),
            state: e.state.clone(),
            area: e.area_id.clone(),
        }
    }
}

// ── List ────────────────────────────────────────────────────────────

pub fn list(session: &Session, args: &ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let companion = &session.companion;

    let mut entities = match &args.domain {
        Some(domain) => companion.entities_by_domain(domain)?,
        None => companion.entities()?,
    };
    if let Some(area) = &args.area {
        entities.retain(|e| e.area_id == *area);
    }

    if entities.is_empty() && matches!(global.output, OutputFormat::Table) {
        if !global.quiet {
            eprintln!("No entities cached. Run: homedeck sync");
        }
        util::offline_notice(companion, global.quiet);
        return Ok(());
    }

    let out = output::render_list(&global.output, &entities, |e| EntityRow::from(e), |e| {
        e.entity_id.clone()
    });
    output::print_output(&out, global.quiet);
    util::offline_notice(companion, global.quiet);
    Ok(())
}

// ── Show ────────────────────────────────────────────────────────────

pub async fn show(
    session: &Session,
    entity_id: &str,
    refresh: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let companion = &session.companion;

    let (entity, live) = if refresh {
        match companion.refresh_entity(entity_id).await? {
            Refreshed::Live(entity) => (entity, true),
            Refreshed::Cached(entity) => (entity, false),
            Refreshed::Missing => {
                return Err(CliError::EntityNotFound {
                    entity_id: entity_id.to_string(),
                });
            }
        }
    } else {
        (util::require_cached(companion, entity_id)?, false)
    };

    let favorite = companion.is_favorite(entity_id);
    let out = output::render_single(
        &global.output,
        &entity,
        |e| entity_detail(e, favorite),
        |e| e.entity_id.clone(),
    );
    output::print_output(&out, global.quiet);

    if refresh {
        if !live && !global.quiet {
            eprintln!("note: hub not reachable, showing cached state");
        }
    } else {
        util::offline_notice(companion, global.quiet);
    }
    Ok(())
}

fn entity_detail(entity: &Entity, favorite: bool) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "Entity:     {}", entity.entity_id);
    let _ = writeln!(out, "Name:       {}", entity.friendly_name);
    let _ = writeln!(out, "State:      {}", output::paint_state(&entity.state));
    let _ = writeln!(out, "Domain:     {}", entity.domain);
    if !entity.area_id.is_empty() {
        let _ = writeln!(out, "Area:       {}", entity.area_id);
    }
    if !entity.icon.is_empty() {
        let _ = writeln!(out, "Icon:       {}", entity.icon);
    }
    let _ = writeln!(out, "Favorite:   {}", if favorite { "yes" } else { "no" });
    if entity.supported_features != 0 {
        let _ = writeln!(out, "Features:   {:#x}", entity.supported_features);
    }
    if let Some(ts) = entity.last_changed {
        let _ = writeln!(out, "Changed:    {}", ts.to_rfc3339());
    }
    if let Some(ts) = entity.last_updated {
        let _ = writeln!(out, "Updated:    {}", ts.to_rfc3339());
    }
    if !entity.attributes.is_empty() {
        let _ = writeln!(out, "Attributes:");
        let _ = write!(out, "{}", output::render_json_pretty(&entity.attributes));
    }

    out.trim_end().to_string()
}
