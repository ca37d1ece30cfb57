// ── Companion facade ──
//
// The single surface UI-level code talks to. Everything forwards 1:1
// to the coordinator or store; the only logic living here is the
// post-command refresh after a service call.

use tracing::warn;

use crate::cache::{CacheManager, FavoriteToggle, Refreshed, SyncOutcome};
use crate::error::CoreError;
use crate::model::Entity;

/// UI-facing handle over the cache layer.
pub struct Companion {
    manager: CacheManager,
}

impl Companion {
    pub fn new(manager: CacheManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &CacheManager {
        &self.manager
    }

    // ── Entity lookups ──────────────────────────────────────────────

    pub fn entities(&self) -> Result<Vec<Entity>, CoreError> {
        self.manager.get_entities()
    }

    pub fn entities_by_domain(&self, domain: &str) -> Result<Vec<Entity>, CoreError> {
        self.manager.get_entities_by_domain(domain)
    }

    pub fn entities_by_area(&self, area_id: &str) -> Result<Vec<Entity>, CoreError> {
        self.manager.get_entities_by_area(area_id)
    }

    pub fn entity(&self, entity_id: &str) -> Result<Option<Entity>, CoreError> {
        self.manager.get_entity(entity_id)
    }

    pub fn entity_count(&self) -> Result<usize, CoreError> {
        self.manager.entity_count()
    }

    // ── Favorites ───────────────────────────────────────────────────

    pub fn favorites(&self) -> Result<Vec<Entity>, CoreError> {
        self.manager.get_favorites()
    }

    pub fn add_favorite(&self, entity_id: &str) -> Result<(), CoreError> {
        self.manager.add_favorite(entity_id)
    }

    pub fn remove_favorite(&self, entity_id: &str) -> Result<(), CoreError> {
        self.manager.remove_favorite(entity_id)
    }

    pub fn is_favorite(&self, entity_id: &str) -> bool {
        self.manager.is_favorite(entity_id)
    }

    pub fn toggle_favorite(&self, entity_id: &str) -> Result<FavoriteToggle, CoreError> {
        self.manager.toggle_favorite(entity_id)
    }

    // ── Refresh and commands ────────────────────────────────────────

    pub async fn refresh_entity(&self, entity_id: &str) -> Result<Refreshed, CoreError> {
        self.manager.refresh_entity(entity_id).await
    }

    pub fn update_entity_state(&self, entity_id: &str, new_state: &str) -> Result<bool, CoreError> {
        self.manager.update_entity_state(entity_id, new_state)
    }

    /// Issue a service call against the hub, then refresh the target
    /// entity so cached reads stop showing the pre-command state.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: Option<&str>,
        extra: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<(), CoreError> {
        let Some(client) = self.manager.hub_client() else {
            return Err(CoreError::RemoteUnavailable);
        };
        client.call_service(domain, service, entity_id, extra).await?;

        if let Some(entity_id) = entity_id {
            if let Err(err) = self.manager.refresh_entity(entity_id).await {
                warn!(entity_id, error = %err, "post-command refresh failed");
            }
        }
        Ok(())
    }

    // ── Sync ────────────────────────────────────────────────────────

    pub async fn sync(&self) -> Result<usize, CoreError> {
        self.manager.sync().await
    }

    pub async fn sync_if_needed(&self) -> Result<SyncOutcome, CoreError> {
        self.manager.sync_if_needed().await
    }

    pub fn should_sync(&self) -> bool {
        self.manager.should_sync()
    }

    // ── Status ──────────────────────────────────────────────────────

    /// Last-known connectivity from the most recent full sync.
    pub fn is_online(&self) -> bool {
        self.manager.is_online()
    }

    /// Live reachability probe, unlike the cached [`is_online`](Self::is_online).
    pub async fn test_connection(&self) -> Result<(), CoreError> {
        let Some(client) = self.manager.hub_client() else {
            return Err(CoreError::RemoteUnavailable);
        };
        client.test_connection().await?;
        Ok(())
    }

    pub fn last_sync(&self) -> i64 {
        self.manager.last_sync()
    }

    pub fn sync_interval(&self) -> u64 {
        self.manager.sync_interval()
    }

    pub fn set_sync_interval(&self, seconds: u64) {
        self.manager.set_sync_interval(seconds);
    }
}
