//! Shared configuration for the homedeck CLI.
//!
//! TOML server profiles, hub token resolution (explicit value or env
//! var), and translation to the connection settings `homedeck_api`
//! consumes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use homedeck_api::{TlsMode, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no hub token configured for server '{server}'")]
    NoToken { server: String },

    #[error("unknown server profile '{name}'")]
    UnknownServer { name: String },

    #[error("no server profiles configured")]
    NoServers,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Name of the server profile used when none is given explicitly.
    pub default_server: Option<String>,

    /// Named hub server profiles.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerProfile>,

    /// Cache layer settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// One hub connection profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerProfile {
    /// Hub address, with or without a scheme (e.g.
    /// "http://homeassistant.local" or just "homeassistant.local").
    pub url: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Long-lived access token (plaintext -- prefer `token_env`).
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    8123
}
fn default_timeout() -> u64 {
    30
}

impl ServerProfile {
    /// Whether this profile carries enough to attempt a connection:
    /// an address and at least one token source.
    pub fn is_connectable(&self) -> bool {
        self.url.is_some() && (self.token.is_some() || self.token_env.is_some())
    }
}

/// Cache layer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Override for the cache database location.
    pub db_path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            db_path: None,
        }
    }
}

fn default_sync_interval() -> u64 {
    300
}

// ── Profile selection ───────────────────────────────────────────────

impl Config {
    /// Pick the server profile to use.
    ///
    /// An explicit `name` must exist. Otherwise `default_server` is
    /// used when it names a connectable profile; a missing or broken
    /// default falls back to the first connectable profile.
    pub fn active_server<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a ServerProfile), ConfigError> {
        if let Some(name) = name {
            return match self.servers.get(name) {
                Some(profile) => Ok((name, profile)),
                None => Err(ConfigError::UnknownServer { name: name.into() }),
            };
        }

        if let Some(default) = self.default_server.as_deref() {
            if let Some(profile) = self.servers.get(default) {
                if profile.is_connectable() {
                    return Ok((default, profile));
                }
            }
        }

        self.servers
            .iter()
            .find(|(_, profile)| profile.is_connectable())
            .map(|(name, profile)| (name.as_str(), profile))
            .ok_or(ConfigError::NoServers)
    }

    /// Profiles that cannot be used for a connection, for warning
    /// display at startup.
    pub fn broken_servers(&self) -> Vec<&str> {
        self.servers
            .iter()
            .filter(|(_, profile)| !profile.is_connectable())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

// ── Connection settings ─────────────────────────────────────────────

/// Everything needed to construct a `HubClient`.
pub struct ConnectionSettings {
    pub base_url: Url,
    pub token: SecretString,
    pub transport: TransportConfig,
}

/// Resolve a profile into connection settings.
pub fn profile_to_connection(
    profile: &ServerProfile,
    name: &str,
) -> Result<ConnectionSettings, ConfigError> {
    let base_url = profile_base_url(profile)?;
    let token = resolve_token(profile, name)?;
    let transport = TransportConfig {
        tls: if profile.insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::System
        },
        timeout: Duration::from_secs(profile.timeout_secs),
    };

    Ok(ConnectionSettings {
        base_url,
        token,
        transport,
    })
}

/// Build the hub base URL from a profile's address and port.
///
/// A bare host gets an `http://` scheme; the profile port applies only
/// when the address itself does not already carry one.
pub fn profile_base_url(profile: &ServerProfile) -> Result<Url, ConfigError> {
    let address = profile.url.as_deref().ok_or_else(|| ConfigError::Validation {
        field: "url".into(),
        reason: "no hub address configured".into(),
    })?;

    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };

    let mut url: Url = with_scheme.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid hub address: {address}"),
    })?;

    if url.port().is_none() {
        url.set_port(Some(profile.port))
            .map_err(|()| ConfigError::Validation {
                field: "url".into(),
                reason: format!("cannot apply port to address: {address}"),
            })?;
    }

    Ok(url)
}

/// Resolve the access token: explicit `token` value first, then the
/// `token_env` environment variable.
pub fn resolve_token(profile: &ServerProfile, name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    if let Some(ref env_name) = profile.token_env {
        if let Ok(value) = std::env::var(env_name) {
            return Ok(SecretString::from(value));
        }
    }

    Err(ConfigError::NoToken {
        server: name.into(),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "homedeck", "homedeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location for the cache database, unless overridden by
/// `cache.db_path`.
pub fn data_path() -> PathBuf {
    ProjectDirs::from("com", "homedeck", "homedeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("cache.db");
            p
        },
        |dirs| dirs.data_dir().join("cache.db"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("homedeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, the canonical file, and
/// `HOMEDECK_*` environment variables. A missing file is not an error.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config merging an explicit TOML file path.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HOMEDECK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// A starter config with one placeholder server, for `config init`.
pub fn example_config() -> Config {
    let mut servers = BTreeMap::new();
    servers.insert(
        "home".to_string(),
        ServerProfile {
            url: Some("http://homeassistant.local".into()),
            port: default_port(),
            token: None,
            token_env: Some("HOMEDECK_TOKEN".into()),
            insecure: false,
            timeout_secs: default_timeout(),
        },
    );

    Config {
        default_server: Some("home".into()),
        servers,
        cache: CacheSettings::default(),
    }
}
