//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use homedeck_config::ConfigError;
use homedeck_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the hub: {reason}")]
    #[diagnostic(
        code(homedeck::unreachable),
        help(
            "Check that the hub is running and reachable.\n\
             Cached data is still available: homedeck list\n\
             For self-signed TLS, try --insecure (-k)."
        )
    )]
    Unreachable { reason: String },

    #[error("No hub configured")]
    #[diagnostic(
        code(homedeck::no_hub),
        help(
            "Create a config with: homedeck config init\n\
             Then set the hub URL and token in the file it prints."
        )
    )]
    NoHub,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Hub rejected the access token (status {status})")]
    #[diagnostic(
        code(homedeck::auth_failed),
        help(
            "Generate a long-lived access token in the hub UI (profile page)\n\
             and set it on the server profile (token or token_env)."
        )
    )]
    AuthRejected { status: u16 },

    // ── Hub answers ──────────────────────────────────────────────────

    #[error("Hub rejected request (status {status})")]
    #[diagnostic(code(homedeck::rejected))]
    Rejected { status: u16, body: String },

    #[error("Could not parse hub answer: {reason}")]
    #[diagnostic(
        code(homedeck::bad_answer),
        help("The hub may be mid-restart or running an unsupported version.")
    )]
    BadAnswer { reason: String },

    // ── Cache lookups ────────────────────────────────────────────────

    #[error("Entity '{entity_id}' is not in the cache")]
    #[diagnostic(
        code(homedeck::not_found),
        help(
            "Run: homedeck list to see cached entities\n\
             Or refresh the cache with: homedeck sync"
        )
    )]
    EntityNotFound { entity_id: String },

    #[error("{message}")]
    #[diagnostic(
        code(homedeck::storage),
        help("The cache database may be locked or corrupt. Its path is shown by: homedeck status")
    )]
    Storage { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(homedeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Server profile '{name}' not found in configuration")]
    #[diagnostic(
        code(homedeck::unknown_server),
        help("List configured servers with: homedeck config show")
    )]
    UnknownServer { name: String },

    #[error("No token configured for server '{server}'")]
    #[diagnostic(
        code(homedeck::no_token),
        help(
            "Set token or token_env on the server profile.\n\
             With token_env, export the named variable before running."
        )
    )]
    NoToken { server: String },

    #[error(transparent)]
    #[diagnostic(code(homedeck::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(
        code(homedeck::json),
        help("Pass --data a JSON object, for example: --data '{{\"brightness\": 120}}'")
    )]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::NoHub => exit_code::CONNECTION,
            Self::AuthRejected { .. } | Self::NoToken { .. } => exit_code::AUTH,
            Self::EntityNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::HubUnreachable { reason } => CliError::Unreachable { reason },

            CoreError::HubRejected { status, body } => {
                if status == 401 || status == 403 {
                    CliError::AuthRejected { status }
                } else {
                    CliError::Rejected { status, body }
                }
            }

            CoreError::RemoteUnavailable => CliError::NoHub,

            CoreError::Parse { reason } => CliError::BadAnswer { reason },

            CoreError::InvalidInput { reason } => CliError::Validation {
                field: "input".into(),
                reason,
            },

            CoreError::Storage { .. } => CliError::Storage {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoToken { server } => CliError::NoToken { server },
            ConfigError::UnknownServer { name } => CliError::UnknownServer { name },
            ConfigError::NoServers => CliError::NoHub,
            other => CliError::Config(Box::new(other)),
        }
    }
}
