//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use hactl_config::ConfigError;
use hactl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CACHE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to Home Assistant at {url}")]
    #[diagnostic(
        code(hactl::connection_failed),
        help(
            "Check that Home Assistant is running and reachable.\n\
             Set the URL with --url, HASS_URL, or `url` in the config file."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Connection timed out after {seconds}s")]
    #[diagnostic(
        code(hactl::timeout),
        help("Increase the timeout with --timeout or check that the server is responsive.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(hactl::auth_failed),
        help(
            "Verify your long-lived access token (Profile > Security in Home Assistant).\n\
             Store a new one with: hactl config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No access token configured")]
    #[diagnostic(
        code(hactl::no_credentials),
        help(
            "Set HASS_TOKEN, pass --token, or run: hactl config set-token\n\
             You can create a token under Profile > Security in Home Assistant."
        )
    )]
    NoCredentials,

    // ── Server ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(hactl::api_error))]
    ApiError {
        code: Option<String>,
        message: String,
    },

    #[error("Protocol error: {message}")]
    #[diagnostic(
        code(hactl::protocol),
        help("The server sent an unexpected reply. Re-run with -vv for details.")
    )]
    Protocol { message: String },

    // ── Cache ────────────────────────────────────────────────────────
    #[error("Entity cache not found at {path}")]
    #[diagnostic(
        code(hactl::cache_missing),
        help(
            "Run: hactl sync\n\
             Or use --filter-mode all to work without the cache."
        )
    )]
    CacheMissing { path: String },

    #[error("Entity cache at {path} is unreadable: {reason}")]
    #[diagnostic(code(hactl::cache_corrupt), help("Run: hactl sync"))]
    CacheCorrupt { path: String, reason: String },

    #[error("Failed to write the entity cache at {path}")]
    #[diagnostic(code(hactl::cache_write))]
    CacheWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Policy ───────────────────────────────────────────────────────
    #[error("'{operation}' requires filter mode 'all' (current: '{mode}')")]
    #[diagnostic(
        code(hactl::requires_all_mode),
        help(
            "Admin commands can reach entities hidden from the assistant.\n\
             Re-run with --filter-mode all, or set `mode = \"all\"` under [filter]."
        )
    )]
    RequiresAllMode { operation: String, mode: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hactl::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(hactl::config),
        help("Check the config file (see: hactl config show).")
    )]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON output: {0}")]
    #[diagnostic(code(hactl::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML output: {0}")]
    #[diagnostic(code(hactl::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials => exit_code::AUTH,
            Self::CacheMissing { .. } | Self::CacheCorrupt { .. } | Self::CacheWrite { .. } => {
                exit_code::CACHE
            }
            Self::Validation { .. } | Self::RequiresAllMode { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NoCredentials => CliError::NoCredentials,

            CoreError::Api { message, code } => CliError::ApiError { code, message },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::CacheMissing { path } => CliError::CacheMissing {
                path: path.display().to_string(),
            },

            CoreError::CacheCorrupt { path, reason } => CliError::CacheCorrupt {
                path: path.display().to_string(),
                reason,
            },

            CoreError::CacheWrite { path, source } => CliError::CacheWrite {
                path: path.display().to_string(),
                source,
            },

            CoreError::RequiresAllMode { operation, mode } => {
                CliError::RequiresAllMode { operation, mode }
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_by_category() {
        let cases: Vec<(CoreError, i32)> = vec![
            (
                CoreError::ConnectionFailed {
                    url: "http://x".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::AuthenticationFailed {
                    message: "bad".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::NoCredentials, exit_code::AUTH),
            (
                CoreError::CacheMissing {
                    path: PathBuf::from("/x"),
                },
                exit_code::CACHE,
            ),
            (
                CoreError::RequiresAllMode {
                    operation: "rename".into(),
                    mode: "exposed".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Api {
                    message: "Entity not found".into(),
                    code: Some("not_found".into()),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, expected) in cases {
            let cli = CliError::from(core);
            assert_eq!(cli.exit_code(), expected, "{cli:?}");
        }
    }

    #[test]
    fn api_error_message_is_verbatim() {
        let cli = CliError::from(CoreError::Api {
            message: "Entity not found".into(),
            code: None,
        });
        assert_eq!(cli.to_string(), "Entity not found");
    }
}
