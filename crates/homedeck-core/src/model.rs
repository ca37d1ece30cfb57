// ── Entity domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single controllable or observable object exposed by the hub.
///
/// Entities are identified by `<domain>.<object_id>` (e.g.
/// `light.kitchen`). The `domain` field is always derived from
/// `entity_id`, never taken from payload fields, so the two cannot
/// disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    /// Short state string (`"on"`, `"23.5"`). Semantics are
    /// domain-dependent and opaque to the cache layer.
    pub state: String,
    pub friendly_name: String,
    pub icon: String,
    pub domain: String,
    /// Area/room tag from the hub registry. Empty means unassigned.
    pub area_id: String,
    /// Full attribute bag as received, stored verbatim.
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub supported_features: i64,
    pub last_changed: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity {
    /// Whether the entity reports an "on"-style active state.
    pub fn is_on(&self) -> bool {
        self.state == "on"
    }

    /// Whether the hub marks this entity as unavailable.
    pub fn is_unavailable(&self) -> bool {
        self.state == "unavailable" || self.state == "unknown"
    }
}

/// Extract the domain prefix from an entity id.
///
/// Returns the substring before the first `.`, or the whole id when
/// there is no dot.
pub fn domain_of(entity_id: &str) -> &str {
    entity_id.split_once('.').map_or(entity_id, |(domain, _)| domain)
}
