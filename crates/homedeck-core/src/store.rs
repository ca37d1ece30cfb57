// ── Entity store ──

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::Entity;
use crate::parse::parse_timestamp;

// An empty incoming area_id means "unknown here", not "unassign":
// state payloads usually omit areas, and a re-save must not clear
// what the registry merge wrote.
const UPSERT_ENTITY: &str = "\
    INSERT INTO entities (
        entity_id, state, friendly_name, icon, domain, area_id,
        attributes_json, supported_features, last_changed, last_updated
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(entity_id) DO UPDATE SET
        state = excluded.state,
        friendly_name = excluded.friendly_name,
        icon = excluded.icon,
        domain = excluded.domain,
        area_id = COALESCE(NULLIF(excluded.area_id, ''), entities.area_id),
        attributes_json = excluded.attributes_json,
        supported_features = excluded.supported_features,
        last_changed = excluded.last_changed,
        last_updated = excluded.last_updated";

const ENTITY_COLUMNS: &str = "entity_id, state, friendly_name, icon, domain, area_id, \
     attributes_json, supported_features, last_changed, last_updated";

/// Durable entity cache backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE entities (
///     entity_id TEXT PRIMARY KEY,
///     state TEXT NOT NULL,
///     friendly_name TEXT NOT NULL,
///     icon TEXT NOT NULL DEFAULT '',
///     domain TEXT NOT NULL,
///     area_id TEXT NOT NULL DEFAULT '',
///     attributes_json TEXT NOT NULL DEFAULT '{}',
///     supported_features INTEGER NOT NULL DEFAULT 0,
///     last_changed TEXT,
///     last_updated TEXT
/// );
/// CREATE TABLE favorites (entity_id TEXT PRIMARY KEY, added_at TEXT NOT NULL);
/// CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
/// ```
///
/// Schema creation is idempotent and runs on every open. The
/// connection is wrapped in a `Mutex`; SQLite serializes writes
/// anyway, so one connection is enough for this workload.
pub struct EntityStore {
    conn: Mutex<Connection>,
}

impl EntityStore {
    /// Open (and if necessary create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store. Used by tests and by callers that
    /// explicitly opt out of persistence.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entities (
                entity_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                friendly_name TEXT NOT NULL,
                icon TEXT NOT NULL DEFAULT '',
                domain TEXT NOT NULL,
                area_id TEXT NOT NULL DEFAULT '',
                attributes_json TEXT NOT NULL DEFAULT '{}',
                supported_features INTEGER NOT NULL DEFAULT 0,
                last_changed TEXT,
                last_updated TEXT
            );
            CREATE TABLE IF NOT EXISTS favorites (
                entity_id TEXT PRIMARY KEY,
                added_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_entities_domain ON entities(domain);
            CREATE INDEX IF NOT EXISTS idx_entities_area ON entities(area_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("entity store mutex poisoned")
    }

    // ── Entities ────────────────────────────────────────────────────

    /// Insert or update a single entity.
    ///
    /// An update keeps the stored area when the incoming record has
    /// none; [`Self::update_entity_area`] is the writer for real
    /// assignment changes.
    pub fn save_entity(&self, entity: &Entity) -> Result<(), CoreError> {
        let (attributes_json, last_changed, last_updated) = encoded_fields(entity);
        self.conn().execute(
            UPSERT_ENTITY,
            params![
                entity.entity_id,
                entity.state,
                entity.friendly_name,
                entity.icon,
                entity.domain,
                entity.area_id,
                attributes_json,
                entity.supported_features,
                last_changed,
                last_updated,
            ],
        )?;
        Ok(())
    }

    /// Upsert a batch of entities inside one transaction.
    ///
    /// Rows that individually fail to save are skipped with a warning;
    /// the count of rows actually written is returned.
    pub fn save_entities(&self, entities: &[Entity]) -> Result<usize, CoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut saved = 0;
        {
            let mut stmt = tx.prepare(UPSERT_ENTITY)?;
            for entity in entities {
                let (attributes_json, last_changed, last_updated) = encoded_fields(entity);
                let result = stmt.execute(params![
                    entity.entity_id,
                    entity.state,
                    entity.friendly_name,
                    entity.icon,
                    entity.domain,
                    entity.area_id,
                    attributes_json,
                    entity.supported_features,
                    last_changed,
                    last_updated,
                ]);
                match result {
                    Ok(_) => saved += 1,
                    Err(err) => {
                        warn!(entity_id = %entity.entity_id, error = %err, "skipping entity save");
                    }
                }
            }
        }
        tx.commit()?;
        debug!(saved, total = entities.len(), "entity batch saved");
        Ok(saved)
    }

    pub fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>, CoreError> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE entity_id = ?1");
        let entity = self
            .conn()
            .query_row(&sql, params![entity_id], row_to_entity)
            .optional()?;
        Ok(entity)
    }

    /// All cached entities, ordered by friendly name.
    pub fn get_all_entities(&self) -> Result<Vec<Entity>, CoreError> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities ORDER BY friendly_name");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let entities = stmt
            .query_map([], row_to_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Cached entities in one domain, ordered by friendly name.
    pub fn get_entities_by_domain(&self, domain: &str) -> Result<Vec<Entity>, CoreError> {
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE domain = ?1 ORDER BY friendly_name"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let entities = stmt
            .query_map(params![domain], row_to_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Cached entities assigned to one area, ordered by friendly name.
    pub fn get_entities_by_area(&self, area_id: &str) -> Result<Vec<Entity>, CoreError> {
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE area_id = ?1 ORDER BY friendly_name"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let entities = stmt
            .query_map(params![area_id], row_to_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Remove one entity. Returns whether a row existed.
    pub fn delete_entity(&self, entity_id: &str) -> Result<bool, CoreError> {
        let rows = self
            .conn()
            .execute("DELETE FROM entities WHERE entity_id = ?1", params![entity_id])?;
        Ok(rows > 0)
    }

    /// Drop every cached entity. Favorites and metadata are kept.
    pub fn clear_entities(&self) -> Result<usize, CoreError> {
        let rows = self.conn().execute("DELETE FROM entities", [])?;
        Ok(rows)
    }

    /// Reassign an entity's area. Returns whether the entity existed.
    pub fn update_entity_area(&self, entity_id: &str, area_id: &str) -> Result<bool, CoreError> {
        let rows = self.conn().execute(
            "UPDATE entities SET area_id = ?1 WHERE entity_id = ?2",
            params![area_id, entity_id],
        )?;
        Ok(rows > 0)
    }

    pub fn count_entities(&self) -> Result<usize, CoreError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ── Favorites ───────────────────────────────────────────────────

    /// Mark an entity as a favorite. Adding twice keeps the original
    /// added-at timestamp.
    pub fn add_favorite(&self, entity_id: &str) -> Result<(), CoreError> {
        self.conn().execute(
            "INSERT OR IGNORE INTO favorites (entity_id, added_at) VALUES (?1, ?2)",
            params![entity_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn remove_favorite(&self, entity_id: &str) -> Result<(), CoreError> {
        self.conn().execute(
            "DELETE FROM favorites WHERE entity_id = ?1",
            params![entity_id],
        )?;
        Ok(())
    }

    pub fn is_favorite(&self, entity_id: &str) -> Result<bool, CoreError> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM favorites WHERE entity_id = ?1",
                params![entity_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Favorited entities that are present in the cache, oldest
    /// favorite first. Favorites pointing at entities not currently
    /// cached are silently absent from the result.
    pub fn get_favorites(&self) -> Result<Vec<Entity>, CoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.entity_id, e.state, e.friendly_name, e.icon, e.domain, e.area_id,
                    e.attributes_json, e.supported_features, e.last_changed, e.last_updated
             FROM favorites f
             JOIN entities e ON e.entity_id = f.entity_id
             ORDER BY f.added_at",
        )?;
        let entities = stmt
            .query_map([], row_to_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    // ── Metadata ────────────────────────────────────────────────────

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.conn().execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, CoreError> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn encoded_fields(entity: &Entity) -> (String, Option<String>, Option<String>) {
    let attributes_json =
        serde_json::to_string(&entity.attributes).unwrap_or_else(|_| String::from("{}"));
    let last_changed = entity.last_changed.map(|dt| dt.to_rfc3339());
    let last_updated = entity.last_updated.map(|dt| dt.to_rfc3339());
    (attributes_json, last_changed, last_updated)
}

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let attributes_json: String = row.get(6)?;
    let last_changed: Option<String> = row.get(8)?;
    let last_updated: Option<String> = row.get(9)?;
    Ok(Entity {
        entity_id: row.get(0)?,
        state: row.get(1)?,
        friendly_name: row.get(2)?,
        icon: row.get(3)?,
        domain: row.get(4)?,
        area_id: row.get(5)?,
        attributes: serde_json::from_str(&attributes_json).unwrap_or_default(),
        supported_features: row.get(7)?,
        last_changed: parse_timestamp(last_changed.as_deref()),
        last_updated: parse_timestamp(last_updated.as_deref()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> EntityStore {
        EntityStore::open_in_memory().unwrap()
    }

    fn entity(entity_id: &str, friendly_name: &str) -> Entity {
        Entity {
            entity_id: entity_id.into(),
            state: "on".into(),
            friendly_name: friendly_name.into(),
            icon: String::new(),
            domain: crate::model::domain_of(entity_id).into(),
            area_id: String::new(),
            attributes: serde_json::Map::new(),
            supported_features: 0,
            last_changed: None,
            last_updated: None,
        }
    }

    #[test]
    fn save_and_get_round_trips_all_fields() {
        let store = store();
        let mut original = entity("light.kitchen", "Kitchen Light");
        original.icon = "mdi:lightbulb".into();
        original.area_id = "kitchen".into();
        original.supported_features = 44;
        original
            .attributes
            .insert("brightness".into(), json!(254));
        original.last_changed = crate::parse::parse_timestamp(Some("2024-03-01T10:30:00+00:00"));

        store.save_entity(&original).unwrap();
        let loaded = store.get_entity("light.kitchen").unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn get_missing_entity_is_none() {
        assert!(store().get_entity("light.ghost").unwrap().is_none());
    }

    #[test]
    fn saving_same_id_overwrites() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();

        let mut updated = entity("light.a", "A");
        updated.state = "off".into();
        store.save_entity(&updated).unwrap();

        assert_eq!(store.count_entities().unwrap(), 1);
        let loaded = store.get_entity("light.a").unwrap().unwrap();
        assert_eq!(loaded.state, "off");
    }

    #[test]
    fn batch_save_reports_count() {
        let store = store();
        let batch = vec![
            entity("light.a", "A"),
            entity("light.b", "B"),
            entity("sensor.c", "C"),
        ];
        assert_eq!(store.save_entities(&batch).unwrap(), 3);
        assert_eq!(store.count_entities().unwrap(), 3);
    }

    #[test]
    fn listing_orders_by_friendly_name() {
        let store = store();
        store.save_entity(&entity("light.z", "Bedroom")).unwrap();
        store.save_entity(&entity("light.a", "Attic")).unwrap();
        store.save_entity(&entity("light.m", "Zen Den")).unwrap();

        let names: Vec<String> = store
            .get_all_entities()
            .unwrap()
            .into_iter()
            .map(|e| e.friendly_name)
            .collect();
        assert_eq!(names, vec!["Attic", "Bedroom", "Zen Den"]);
    }

    #[test]
    fn domain_filter_is_exact() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();
        store.save_entity(&entity("light.b", "B")).unwrap();
        store.save_entity(&entity("sensor.c", "C")).unwrap();

        let lights = store.get_entities_by_domain("light").unwrap();
        assert_eq!(lights.len(), 2);
        assert!(lights.iter().all(|e| e.domain == "light"));

        assert!(store.get_entities_by_domain("fan").unwrap().is_empty());
    }

    #[test]
    fn area_filter_matches_assigned_entities() {
        let store = store();
        let mut in_kitchen = entity("light.a", "A");
        in_kitchen.area_id = "kitchen".into();
        store.save_entity(&in_kitchen).unwrap();
        store.save_entity(&entity("light.b", "B")).unwrap();

        let found = store.get_entities_by_area("kitchen").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_id, "light.a");
    }

    #[test]
    fn update_area_reports_presence() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();

        assert!(store.update_entity_area("light.a", "den").unwrap());
        assert!(!store.update_entity_area("light.ghost", "den").unwrap());

        let loaded = store.get_entity("light.a").unwrap().unwrap();
        assert_eq!(loaded.area_id, "den");
    }

    #[test]
    fn resave_with_empty_area_keeps_assignment() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();
        store.update_entity_area("light.a", "den").unwrap();

        store.save_entity(&entity("light.a", "A")).unwrap();
        assert_eq!(store.get_entity("light.a").unwrap().unwrap().area_id, "den");

        let mut moved = entity("light.a", "A");
        moved.area_id = "loft".into();
        store.save_entity(&moved).unwrap();
        assert_eq!(
            store.get_entity("light.a").unwrap().unwrap().area_id,
            "loft"
        );
    }

    #[test]
    fn delete_reports_presence() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();
        assert!(store.delete_entity("light.a").unwrap());
        assert!(!store.delete_entity("light.a").unwrap());
    }

    #[test]
    fn favorites_survive_clearing_entities() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();
        store.add_favorite("light.a").unwrap();

        assert_eq!(store.clear_entities().unwrap(), 1);
        assert_eq!(store.count_entities().unwrap(), 0);
        assert!(store.is_favorite("light.a").unwrap());
        // The favorite joins back in once the entity is re-cached.
        assert!(store.get_favorites().unwrap().is_empty());
        store.save_entity(&entity("light.a", "A")).unwrap();
        assert_eq!(store.get_favorites().unwrap().len(), 1);
    }

    #[test]
    fn favorites_list_in_added_order() {
        let store = store();
        store.save_entity(&entity("light.b", "B")).unwrap();
        store.save_entity(&entity("light.a", "A")).unwrap();

        store.add_favorite("light.b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.add_favorite("light.a").unwrap();

        let ids: Vec<String> = store
            .get_favorites()
            .unwrap()
            .into_iter()
            .map(|e| e.entity_id)
            .collect();
        assert_eq!(ids, vec!["light.b", "light.a"]);
    }

    #[test]
    fn re_adding_favorite_keeps_original_position() {
        let store = store();
        store.save_entity(&entity("light.a", "A")).unwrap();
        store.save_entity(&entity("light.b", "B")).unwrap();

        store.add_favorite("light.a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.add_favorite("light.b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.add_favorite("light.a").unwrap();

        let ids: Vec<String> = store
            .get_favorites()
            .unwrap()
            .into_iter()
            .map(|e| e.entity_id)
            .collect();
        assert_eq!(ids, vec!["light.a", "light.b"]);
    }

    #[test]
    fn remove_favorite_clears_flag() {
        let store = store();
        store.add_favorite("light.a").unwrap();
        assert!(store.is_favorite("light.a").unwrap());

        store.remove_favorite("light.a").unwrap();
        assert!(!store.is_favorite("light.a").unwrap());
        assert!(!store.is_favorite("light.never_added").unwrap());
    }

    #[test]
    fn metadata_round_trip_and_overwrite() {
        let store = store();
        assert!(store.get_metadata("last_sync").unwrap().is_none());

        store.set_metadata("last_sync", "1700000000").unwrap();
        assert_eq!(
            store.get_metadata("last_sync").unwrap().as_deref(),
            Some("1700000000")
        );

        store.set_metadata("last_sync", "1700000600").unwrap();
        assert_eq!(
            store.get_metadata("last_sync").unwrap().as_deref(),
            Some("1700000600")
        );
    }
}
