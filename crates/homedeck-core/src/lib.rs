// homedeck-core: Offline-first entity cache and sync engine between
// homedeck-api and consumers (CLI/UI).

pub mod cache;
pub mod companion;
pub mod error;
pub mod model;
pub mod parse;
pub mod registry;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheManager, DEFAULT_SYNC_INTERVAL, FavoriteToggle, Refreshed, SyncOutcome};
pub use companion::Companion;
pub use error::CoreError;
pub use model::{Entity, domain_of};
pub use store::EntityStore;
