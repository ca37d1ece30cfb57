//! Shared helpers for command handlers.

use homedeck_core::{Companion, Entity};

use crate::error::CliError;
use crate::output;

/// Look up a cached entity, mapping absence to a user-facing error.
pub fn require_cached(companion: &Companion, entity_id: &str) -> Result<Entity, CliError> {
    companion
        .entity(entity_id)?
        .ok_or_else(|| CliError::EntityNotFound {
            entity_id: entity_id.to_string(),
        })
}

/// Parse the `--data` argument, requiring a JSON object.
pub fn parse_service_data(
    raw: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, CliError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(CliError::Validation {
            field: "data".into(),
            reason: "expected a JSON object".into(),
        }),
    }
}

/// Print the offline notice to stderr when a command served cached data.
pub fn offline_notice(companion: &Companion, quiet: bool) {
    if quiet || companion.is_online() {
        return;
    }
    eprintln!(
        "note: hub offline, showing cached data (last sync: {})",
        output::format_age(companion.last_sync())
    );
}
