// ── Area registry scanning ──
//
// The hub's entity-registry template endpoint answers with a JSON-ish
// array of {"e":"<entity_id>","a":"<area_id>"} pairs, possibly wrapped
// in stray template output. This scanner extracts marker-delimited
// pairs without assuming the blob is valid JSON. It is deliberately
// isolated so it can be swapped for a real deserializer if the hub
// ever emits clean output for this endpoint.

const ENTITY_MARKER: &str = "\"e\":\"";
const AREA_MARKER: &str = "\"a\":\"";

/// An area marker only pairs with the entity it directly follows; this
/// caps how far past the entity id's closing quote the marker may
/// start.
const AREA_PROXIMITY: usize = 20;

/// Extract `(entity_id, area_id)` pairs from a registry blob.
///
/// Pairs with an empty entity id or area id are dropped. A blob
/// truncated mid-area keeps the partial value it carried; a blob
/// truncated mid-entity ends the scan.
pub fn parse_area_pairs(blob: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut cursor = 0;

    while let Some(found) = blob[cursor..].find(ENTITY_MARKER) {
        let entity_start = cursor + found + ENTITY_MARKER.len();
        let Some(entity_len) = blob[entity_start..].find('"') else {
            break;
        };
        let entity_id = &blob[entity_start..entity_start + entity_len];
        // The next scan starts right after the entity id. Markers never
        // occur inside quoted values, so re-covering the area text is
        // harmless.
        cursor = entity_start + entity_len + 1;

        let rest = &blob[cursor..];
        let Some(area_found) = rest.find(AREA_MARKER) else {
            continue;
        };
        if area_found > AREA_PROXIMITY {
            continue;
        }
        let area_start = area_found + AREA_MARKER.len();
        let area_id = match rest[area_start..].find('"') {
            Some(len) => &rest[area_start..area_start + len],
            None => &rest[area_start..],
        };

        if !entity_id.is_empty() && !area_id.is_empty() {
            pairs.push((entity_id.to_string(), area_id.to_string()));
        }
    }

    pairs
}
