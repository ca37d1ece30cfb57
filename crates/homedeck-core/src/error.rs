// ── Core error types ──
//
// User-facing errors from homedeck-core. Consumers never see reqwest
// errors or raw JSON parse failures directly. The
// `From<homedeck_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage errors ───────────────────────────────────────────────
    #[error("Cache storage error: {source}")]
    Storage {
        #[from]
        source: rusqlite::Error,
    },

    // ── Hub errors ───────────────────────────────────────────────────
    #[error("Cannot reach hub: {reason}")]
    HubUnreachable { reason: String },

    #[error("Hub rejected request (status {status})")]
    HubRejected { status: u16, body: String },

    /// No hub client is configured, so the requested operation cannot
    /// leave the local cache.
    #[error("No hub connection configured")]
    RemoteUnavailable,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Failed to parse hub response: {reason}")]
    Parse { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl CoreError {
    /// Whether this error originated in the local cache database.
    pub fn is_storage(&self) -> bool {
        matches!(self, CoreError::Storage { .. })
    }

    /// Whether this error means the hub could not be used (network
    /// failure, rejection, or no client configured at all).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CoreError::HubUnreachable { .. }
                | CoreError::HubRejected { .. }
                | CoreError::RemoteUnavailable
        )
    }

    /// The HTTP status the hub answered with, when there was one.
    pub fn hub_status(&self) -> Option<u16> {
        match self {
            CoreError::HubRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<homedeck_api::Error> for CoreError {
    fn from(err: homedeck_api::Error) -> Self {
        match err {
            homedeck_api::Error::Status { status, body } => {
                CoreError::HubRejected { status, body }
            }
            homedeck_api::Error::Transport(e) => CoreError::HubUnreachable {
                reason: e.to_string(),
            },
            homedeck_api::Error::Tls(msg) => CoreError::HubUnreachable {
                reason: format!("TLS error: {msg}"),
            },
            homedeck_api::Error::InvalidUrl(e) => CoreError::InvalidInput {
                reason: format!("Invalid URL: {e}"),
            },
        }
    }
}
