//! CLI configuration — thin wrapper around `homedeck_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` overrides (--profile, --db, --insecure, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use homedeck_api::{HubClient, TlsMode};
use homedeck_core::{CacheManager, Companion, CoreError, EntityStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use homedeck_config::{
    Config, ConfigError, config_path, data_path, example_config, load_config, profile_to_connection,
    save_config_to,
};

// ── Session assembly ────────────────────────────────────────────────

/// Everything a command handler needs: the facade plus the resolved
/// identity of what it talks to.
pub struct Session {
    pub companion: Companion,
    pub server_name: Option<String>,
    pub hub_url: Option<String>,
    pub db_path: PathBuf,
}

/// Resolve config file, environment, and flags into a ready [`Session`].
///
/// An empty or missing server config yields an offline session instead of
/// an error; commands that need the hub fail at call time. An explicitly
/// requested profile that is broken still fails here.
pub fn build_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = load_config()?;

    for name in cfg.broken_servers() {
        warn!(server = name, "server profile missing url or token, skipping");
    }

    let db_path = resolve_db_path(global, &cfg);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = EntityStore::open(&db_path)?;

    let (server_name, hub_url, client) = match cfg.active_server(global.profile.as_deref()) {
        Ok((name, profile)) => {
            let mut settings = profile_to_connection(profile, name)?;
            if global.insecure {
                settings.transport.tls = TlsMode::DangerAcceptInvalid;
            }
            if let Some(secs) = global.timeout {
                settings.transport.timeout = Duration::from_secs(secs);
            }
            let hub_url = settings.base_url.to_string();
            let client = HubClient::new(settings.base_url, settings.token, &settings.transport)
                .map_err(CoreError::from)?;
            (Some(name.to_string()), Some(hub_url), Some(client))
        }
        Err(ConfigError::NoServers) => {
            warn!("no server profiles configured, running offline");
            (None, None, None)
        }
        Err(err) => return Err(err.into()),
    };

    let manager = CacheManager::new(store, client);
    manager.set_sync_interval(cfg.cache.sync_interval_secs);

    Ok(Session {
        companion: Companion::new(manager),
        server_name,
        hub_url,
        db_path,
    })
}

/// Database path precedence: `--db` flag, then config, then the platform
/// data directory.
fn resolve_db_path(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    if let Some(ref path) = global.db {
        return path.clone();
    }
    if let Some(ref path) = cfg.cache.db_path {
        return path.clone();
    }
    data_path()
}
