// ── Core error types ──
//
// User-facing errors from hactl-core. Consumers never see raw frames or
// WebSocket close codes; the `From<hactl_api::Error>` impl translates
// session-layer errors into domain-appropriate variants.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Home Assistant at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Connection to Home Assistant timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("No access token configured")]
    NoCredentials,

    // ── Server errors ────────────────────────────────────────────────
    /// A command was rejected by the server; the message is the server's.
    #[error("{message}")]
    Api {
        message: String,
        /// Server error code (e.g. `not_found`, `unauthorized`).
        code: Option<String>,
    },

    /// The session desynchronised or the server sent something unreadable.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Cache errors ─────────────────────────────────────────────────
    #[error("Filter cache not found at {}", path.display())]
    CacheMissing { path: PathBuf },

    #[error("Filter cache at {} is unreadable: {reason}", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Failed to write filter cache at {}: {source}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Policy errors ────────────────────────────────────────────────
    #[error("'{operation}' requires filter mode 'all' (current mode: '{mode}')")]
    RequiresAllMode { operation: String, mode: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from session-layer errors ─────────────────────────────

impl From<hactl_api::Error> for CoreError {
    fn from(err: hactl_api::Error) -> Self {
        use hactl_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::Handshake { expected, got } => CoreError::AuthenticationFailed {
                message: format!("unexpected handshake frame: expected {expected}, got '{got}'"),
            },
            Api::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            Api::UnsupportedScheme(scheme) => CoreError::Config {
                message: format!("Unsupported URL scheme '{scheme}'"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Transport(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            Api::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("connection closed (code {code}): {reason}"),
            },
            Api::Api { code, message } => CoreError::Api { message, code },
            Api::Protocol { message } => CoreError::Protocol { message },
            Api::Deserialization { message, body: _ } => CoreError::Protocol { message },
        }
    }
}

impl CoreError {
    /// Attach the server URL to connection failures that lack one.
    pub(crate) fn with_url(self, url: &url::Url) -> Self {
        match self {
            CoreError::ConnectionFailed { url: u, reason } if u.is_empty() => {
                CoreError::ConnectionFailed {
                    url: url.to_string(),
                    reason,
                }
            }
            other => other,
        }
    }
}
