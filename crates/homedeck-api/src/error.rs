use thiserror::Error;

/// Top-level error type for the `homedeck-api` crate.
///
/// Covers every failure mode of a hub call: transport problems (no HTTP
/// status at all) and application failures (hub reachable, non-2xx status).
/// `homedeck-core` maps these into its own error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Hub responses ───────────────────────────────────────────────
    /// The hub answered with a non-2xx status. The body is kept verbatim
    /// for diagnostics; callers treat every status uniformly as failure.
    #[error("Hub returned HTTP {status}")]
    Status { status: u16, body: String },
}

impl Error {
    /// The HTTP status of an application failure, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the hub never answered (network-level failure).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Tls(_))
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the hub rejected our token.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns `true` if the hub answered 404 (e.g. unknown entity id).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
