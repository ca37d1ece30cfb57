// ── Cache/sync coordination ──
//
// Orchestrates full syncs, staleness checks, single-entity refreshes,
// and optimistic state updates over the entity store and hub client.
// Entirely pull-based: nothing here spawns background tasks. Callers
// drive sync timing by polling `should_sync` / `sync_if_needed`.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, info, warn};

use homedeck_api::HubClient;

use crate::error::CoreError;
use crate::model::Entity;
use crate::parse;
use crate::registry;
use crate::store::EntityStore;

/// Default interval between automatic syncs, in seconds.
pub const DEFAULT_SYNC_INTERVAL: u64 = 300;
/// Floor for configured sync intervals; values below it are ignored.
const MIN_SYNC_INTERVAL: u64 = 60;
/// Metadata key persisting the epoch of the last successful full sync.
const LAST_SYNC_KEY: &str = "last_sync";

// ── Operation outcomes ───────────────────────────────────────────────

/// Result of a sync attempt that may be skipped.
///
/// `Skipped` is distinct from `Synced(0)`: the former means no sync
/// ran, the latter would mean a sync ran and wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(usize),
    Skipped,
}

/// Where the data for a single-entity refresh came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Refreshed {
    /// Fresh from the hub; the cache has been updated.
    Live(Entity),
    /// The hub could not answer; this is the cached copy.
    Cached(Entity),
    /// The hub could not answer and nothing was cached.
    Missing,
}

impl Refreshed {
    /// The entity carried by this outcome, if any.
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Refreshed::Live(entity) | Refreshed::Cached(entity) => Some(entity),
            Refreshed::Missing => None,
        }
    }
}

/// Which way a favorite toggle flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

// ── CacheManager ─────────────────────────────────────────────────────

/// Coordinates the entity store and the hub client.
///
/// Tracks two axes of session state: connectivity (did the last full
/// sync succeed) and freshness (has `sync_interval` elapsed since
/// `last_sync`). Session fields are atomics because a UI layer may
/// poll them at arbitrary times relative to an in-flight sync.
pub struct CacheManager {
    store: EntityStore,
    client: Option<HubClient>,
    /// Epoch seconds of the last successful full sync. Zero means
    /// never synced.
    last_sync: AtomicI64,
    sync_interval: AtomicU64,
    /// Flipped only by full syncs. A failed single-entity refresh
    /// leaves it alone.
    last_full_sync_ok: AtomicBool,
}

impl CacheManager {
    /// Build a coordinator over an opened store.
    ///
    /// `client` is `None` for permanently-offline operation: reads
    /// serve from cache and sync operations report the remote as
    /// unavailable.
    pub fn new(store: EntityStore, client: Option<HubClient>) -> Self {
        let last_sync = match store.get_metadata(LAST_SYNC_KEY) {
            Ok(value) => value.and_then(|v| v.parse().ok()).unwrap_or(0),
            Err(err) => {
                warn!(error = %err, "could not read last sync time, assuming never synced");
                0
            }
        };
        let has_client = client.is_some();

        Self {
            store,
            client,
            last_sync: AtomicI64::new(last_sync),
            sync_interval: AtomicU64::new(DEFAULT_SYNC_INTERVAL),
            last_full_sync_ok: AtomicBool::new(has_client),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn hub_client(&self) -> Option<&HubClient> {
        self.client.as_ref()
    }

    // ── Full sync ───────────────────────────────────────────────────

    /// Unconditional full sync: fetch every state from the hub, bulk
    /// save, then merge area assignments best-effort.
    ///
    /// A failed fetch marks the session offline and leaves all cached
    /// data untouched. A response that parses to zero entities is
    /// treated as a failed sync rather than an instruction to empty
    /// the cache.
    pub async fn sync(&self) -> Result<usize, CoreError> {
        let Some(client) = &self.client else {
            return Err(CoreError::RemoteUnavailable);
        };

        info!("starting full sync");
        let body = match client.get_all_states().await {
            Ok(body) => body,
            Err(err) => {
                self.last_full_sync_ok.store(false, Ordering::Relaxed);
                warn!(error = %err, "full state fetch failed");
                return Err(err.into());
            }
        };

        let entities = parse::parse_states(&body)?;
        if entities.is_empty() {
            return Err(CoreError::Parse {
                reason: "hub returned no entities".into(),
            });
        }
        debug!(parsed = entities.len(), "parsed hub states");

        let saved = self.store.save_entities(&entities)?;

        // Area assignments ride on a second fetch. A sync without
        // fresh areas is still a successful sync.
        match client.get_entity_registry().await {
            Ok(blob) => self.apply_area_pairs(&blob),
            Err(err) => {
                debug!(error = %err, "area registry fetch failed, skipping area merge");
            }
        }

        let now = Utc::now().timestamp();
        self.last_sync.store(now, Ordering::Relaxed);
        self.last_full_sync_ok.store(true, Ordering::Relaxed);
        if let Err(err) = self.store.set_metadata(LAST_SYNC_KEY, &now.to_string()) {
            warn!(error = %err, "could not persist last sync time");
        }

        info!(entities = saved, "full sync complete");
        Ok(saved)
    }

    fn apply_area_pairs(&self, blob: &str) {
        let mut updated = 0;
        for (entity_id, area_id) in registry::parse_area_pairs(blob) {
            match self.store.update_entity_area(&entity_id, &area_id) {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(entity_id = %entity_id, error = %err, "area update failed");
                }
            }
        }
        debug!(updated, "merged area assignments");
    }

    /// Whether enough time has passed since the last successful sync.
    /// Always false without a hub client.
    pub fn should_sync(&self) -> bool {
        if self.client.is_none() {
            return false;
        }
        is_stale(
            Utc::now().timestamp(),
            self.last_sync.load(Ordering::Relaxed),
            self.sync_interval.load(Ordering::Relaxed),
        )
    }

    /// Sync only when the cache has gone stale.
    pub async fn sync_if_needed(&self) -> Result<SyncOutcome, CoreError> {
        if !self.should_sync() {
            return Ok(SyncOutcome::Skipped);
        }
        let saved = self.sync().await?;
        Ok(SyncOutcome::Synced(saved))
    }

    // ── Entity access ───────────────────────────────────────────────

    pub fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>, CoreError> {
        self.store.get_entity(entity_id)
    }

    pub fn get_entities(&self) -> Result<Vec<Entity>, CoreError> {
        self.store.get_all_entities()
    }

    pub fn get_entities_by_domain(&self, domain: &str) -> Result<Vec<Entity>, CoreError> {
        self.store.get_entities_by_domain(domain)
    }

    pub fn get_entities_by_area(&self, area_id: &str) -> Result<Vec<Entity>, CoreError> {
        self.store.get_entities_by_area(area_id)
    }

    /// Refresh one entity from the hub.
    ///
    /// Any remote failure (no client, transport error, rejection, or
    /// an unparseable response) silently degrades to the cached copy.
    /// Only storage errors surface as `Err`.
    pub async fn refresh_entity(&self, entity_id: &str) -> Result<Refreshed, CoreError> {
        let Some(client) = &self.client else {
            return self.cached_fallback(entity_id);
        };

        let body = match client.get_state(entity_id).await {
            Ok(body) => body,
            Err(err) => {
                debug!(entity_id, error = %err, "refresh fetch failed, serving cached");
                return self.cached_fallback(entity_id);
            }
        };

        match parse::parse_state(&body) {
            Ok(entity) => {
                self.store.save_entity(&entity)?;
                Ok(Refreshed::Live(entity))
            }
            Err(err) => {
                warn!(entity_id, error = %err, "refresh response unparseable, serving cached");
                self.cached_fallback(entity_id)
            }
        }
    }

    fn cached_fallback(&self, entity_id: &str) -> Result<Refreshed, CoreError> {
        Ok(match self.store.get_entity(entity_id)? {
            Some(entity) => Refreshed::Cached(entity),
            None => Refreshed::Missing,
        })
    }

    /// Optimistic local state overwrite, applied right after a control
    /// command is issued and before any confirming refresh.
    ///
    /// Returns `Ok(false)` when the entity is not cached; nothing is
    /// created.
    pub fn update_entity_state(&self, entity_id: &str, new_state: &str) -> Result<bool, CoreError> {
        let Some(mut entity) = self.store.get_entity(entity_id)? else {
            return Ok(false);
        };
        entity.state = new_state.to_string();
        self.store.save_entity(&entity)?;
        Ok(true)
    }

    pub fn entity_count(&self) -> Result<usize, CoreError> {
        self.store.count_entities()
    }

    // ── Favorites ───────────────────────────────────────────────────

    pub fn add_favorite(&self, entity_id: &str) -> Result<(), CoreError> {
        self.store.add_favorite(entity_id)
    }

    pub fn remove_favorite(&self, entity_id: &str) -> Result<(), CoreError> {
        self.store.remove_favorite(entity_id)
    }

    /// Read-side favorite check. A storage error degrades to `false`
    /// so display code never has to branch on it.
    pub fn is_favorite(&self, entity_id: &str) -> bool {
        match self.store.is_favorite(entity_id) {
            Ok(flag) => flag,
            Err(err) => {
                warn!(entity_id, error = %err, "favorite lookup failed");
                false
            }
        }
    }

    pub fn get_favorites(&self) -> Result<Vec<Entity>, CoreError> {
        self.store.get_favorites()
    }

    /// Flip favorite membership and report which way it went.
    pub fn toggle_favorite(&self, entity_id: &str) -> Result<FavoriteToggle, CoreError> {
        if entity_id.is_empty() {
            return Err(CoreError::InvalidInput {
                reason: "entity id must not be empty".into(),
            });
        }

        if self.store.is_favorite(entity_id)? {
            self.store.remove_favorite(entity_id)?;
            Ok(FavoriteToggle::Removed)
        } else {
            self.store.add_favorite(entity_id)?;
            Ok(FavoriteToggle::Added)
        }
    }

    // ── Session status ──────────────────────────────────────────────

    /// Last-known connectivity, as decided by the most recent full
    /// sync. Not a live probe.
    pub fn is_online(&self) -> bool {
        self.last_full_sync_ok.load(Ordering::Relaxed)
    }

    /// Epoch seconds of the last successful full sync; zero if never.
    pub fn last_sync(&self) -> i64 {
        self.last_sync.load(Ordering::Relaxed)
    }

    pub fn sync_interval(&self) -> u64 {
        self.sync_interval.load(Ordering::Relaxed)
    }

    /// Change the staleness interval. Values below one minute are
    /// ignored.
    pub fn set_sync_interval(&self, seconds: u64) {
        if seconds < MIN_SYNC_INTERVAL {
            warn!(seconds, "ignoring sync interval below {MIN_SYNC_INTERVAL}s floor");
            return;
        }
        self.sync_interval.store(seconds, Ordering::Relaxed);
    }
}

fn is_stale(now: i64, last_sync: i64, interval: u64) -> bool {
    now.saturating_sub(last_sync) >= i64::try_from(interval).unwrap_or(i64::MAX)
}
