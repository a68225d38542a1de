use thiserror::Error;

/// Top-level error type for the `hactl-api` crate.
///
/// Covers every failure mode of a WebSocket session: dialing, the
/// authentication handshake, frame transport, protocol desync, and
/// server-side command rejection. `hactl-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server rejected the access token (`auth_invalid`).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The server sent a frame the handshake does not allow at this step.
    #[error("Unexpected handshake frame: expected {expected}, got '{got}'")]
    Handshake { expected: &'static str, got: String },

    // ── Connection ──────────────────────────────────────────────────
    /// Dialing the WebSocket endpoint failed (DNS, refused, TLS, upgrade).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The server URL uses a scheme we cannot turn into a WebSocket URL.
    #[error("Unsupported URL scheme '{0}' (expected http, https, ws or wss)")]
    UnsupportedScheme(String),

    /// Connect + handshake did not finish in time.
    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// Writing or reading a frame failed at the WebSocket layer.
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    /// The connection was closed while a frame was expected.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Protocol ────────────────────────────────────────────────────
    /// Frame shape or correlation violated the protocol (id mismatch,
    /// missing `type`, binary frame). The session is desynchronised.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// A decoded reply carried `success: false`. The message is the
    /// server's, verbatim.
    #[error("{message}")]
    Api {
        code: Option<String>,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw frame for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the credentials were rejected or the handshake
    /// went off-script; the user has to re-authenticate.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Handshake { .. })
    }

    /// Returns `true` if the server could not be reached at all.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::WebSocketConnect(_) | Self::Timeout { .. })
    }

    /// Extract the server error code of a rejected command, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn deserialization(err: &serde_json::Error, body: &str) -> Self {
        let preview = &body[..floor_char_boundary(body, 200)];
        Self::Deserialization {
            message: format!("{err} (frame preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_server_message_verbatim() {
        let err = Error::Api {
            code: Some("not_found".into()),
            message: "Entity not found".into(),
        };
        assert_eq!(err.to_string(), "Entity not found");
        assert_eq!(err.api_error_code(), Some("not_found"));
    }

    #[test]
    fn handshake_errors_count_as_auth_failures() {
        let err = Error::Handshake {
            expected: "auth_required",
            got: "auth_ok".into(),
        };
        assert!(err.is_auth_failure());
        assert!(!err.is_connect_failure());
    }

    #[test]
    fn deserialization_preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let parse_err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();
        let err = Error::deserialization(&parse_err, &body);
        match err {
            Error::Deserialization { body: raw, .. } => assert_eq!(raw, body),
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
