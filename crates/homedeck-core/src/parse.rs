// ── Entity payload parsing ──
//
// Converts raw hub state payloads into `Entity` records. Array parses
// are tolerant: malformed records are skipped with a warning rather
// than failing the whole batch. Single-record parses fail hard so the
// caller can fall back to cached data.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{Entity, domain_of};

/// Raw shape of one state object as the hub sends it. Only the id is
/// mandatory; everything else gets a default during conversion.
#[derive(Debug, Deserialize)]
struct RawState {
    entity_id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    last_changed: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

impl RawState {
    fn into_entity(self) -> Entity {
        let friendly_name = self
            .attributes
            .get("friendly_name")
            .and_then(Value::as_str)
            .unwrap_or(&self.entity_id)
            .to_string();
        let icon = self
            .attributes
            .get("icon")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let area_id = self
            .attributes
            .get("area_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let supported_features = self
            .attributes
            .get("supported_features")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let domain = domain_of(&self.entity_id).to_string();

        Entity {
            state: self.state.unwrap_or_else(|| "unknown".into()),
            friendly_name,
            icon,
            domain,
            area_id,
            // Hoisted fields stay in the bag too; it is the verbatim
            // attribute payload.
            attributes: self.attributes,
            supported_features,
            last_changed: parse_timestamp(self.last_changed.as_deref()),
            last_updated: parse_timestamp(self.last_updated.as_deref()),
            entity_id: self.entity_id,
        }
    }
}

/// Parse an RFC 3339 timestamp, treating anything unparseable as
/// absent. Shared with the store, which reads back the same format.
pub(crate) fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a single state payload into an `Entity`.
pub fn parse_state(body: &str) -> Result<Entity, CoreError> {
    let raw: RawState = serde_json::from_str(body).map_err(|e| CoreError::Parse {
        reason: e.to_string(),
    })?;
    Ok(raw.into_entity())
}

/// Parse an array of state payloads.
///
/// Records that fail to deserialize (most commonly a missing
/// `entity_id`) are dropped with a warning. An empty result is not an
/// error here; the caller decides what an empty hub answer means.
pub fn parse_states(body: &str) -> Result<Vec<Entity>, CoreError> {
    let records: Vec<Value> = serde_json::from_str(body).map_err(|e| CoreError::Parse {
        reason: e.to_string(),
    })?;

    let mut entities = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<RawState>(record) {
            Ok(raw) => entities.push(raw.into_entity()),
            Err(err) => warn!(error = %err, "skipping malformed state record"),
        }
    }
    Ok(entities)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_record_hoists_attributes() {
        let body = json!({
            "entity_id": "light.kitchen",
            "state": "on",
            "attributes": {
                "friendly_name": "Kitchen Light",
                "icon": "mdi:lightbulb",
                "supported_features": 44,
                "area_id": "kitchen",
                "brightness": 254
            },
            "last_changed": "2024-03-01T10:30:00+00:00",
            "last_updated": "2024-03-01T10:30:05+00:00"
        })
        .to_string();

        let entity = parse_state(&body).unwrap();
        assert_eq!(entity.entity_id, "light.kitchen");
        assert_eq!(entity.state, "on");
        assert_eq!(entity.friendly_name, "Kitchen Light");
        assert_eq!(entity.icon, "mdi:lightbulb");
        assert_eq!(entity.domain, "light");
        assert_eq!(entity.area_id, "kitchen");
        assert_eq!(entity.supported_features, 44);
        assert_eq!(entity.attributes.get("brightness"), Some(&json!(254)));
        // Hoisted fields remain in the verbatim bag.
        assert_eq!(
            entity.attributes.get("friendly_name"),
            Some(&json!("Kitchen Light"))
        );
        assert!(entity.last_changed.is_some());
        assert!(entity.last_updated.unwrap() > entity.last_changed.unwrap());
    }

    #[test]
    fn missing_optionals_fall_back_to_defaults() {
        let body = json!({ "entity_id": "sensor.garage_temp" }).to_string();

        let entity = parse_state(&body).unwrap();
        assert_eq!(entity.state, "unknown");
        assert_eq!(entity.friendly_name, "sensor.garage_temp");
        assert_eq!(entity.icon, "");
        assert_eq!(entity.area_id, "");
        assert_eq!(entity.supported_features, 0);
        assert!(entity.attributes.is_empty());
        assert!(entity.last_changed.is_none());
    }

    #[test]
    fn missing_entity_id_fails_single_parse() {
        let body = json!({ "state": "on" }).to_string();
        let err = parse_state(&body).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn array_parse_skips_malformed_records() {
        let body = json!([
            { "entity_id": "light.a", "state": "on" },
            { "state": "orphaned" },
            { "entity_id": "switch.b", "state": "off" }
        ])
        .to_string();

        let entities = parse_states(&body).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_id, "light.a");
        assert_eq!(entities[1].entity_id, "switch.b");
    }

    #[test]
    fn non_array_body_fails_array_parse() {
        let err = parse_states("{\"entity_id\": \"light.a\"}").unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn empty_array_is_ok_here() {
        let entities = parse_states("[]").unwrap();
        assert!(entities.is_empty());
    }

    #[test]
    fn unparseable_timestamp_becomes_none() {
        let body = json!({
            "entity_id": "light.a",
            "last_changed": "yesterday-ish"
        })
        .to_string();

        let entity = parse_state(&body).unwrap();
        assert!(entity.last_changed.is_none());
    }

    #[test]
    fn non_numeric_supported_features_defaults_to_zero() {
        let body = json!({
            "entity_id": "light.a",
            "attributes": { "supported_features": "lots" }
        })
        .to_string();

        let entity = parse_state(&body).unwrap();
        assert_eq!(entity.supported_features, 0);
    }
}
