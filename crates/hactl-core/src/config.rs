// ── Runtime connection configuration ──
//
// Describes *how* to reach a Home Assistant server and where the filter
// cache lives. Carries the credential but never touches config files;
// the CLI resolves a profile and hands a `ContextConfig` in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::filter::FilterMode;

/// Default server URL when nothing else is configured.
pub const DEFAULT_URL: &str = "http://homeassistant.local:8123";

/// Configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Server base URL (`http(s)://host:port`, or a `ws(s)://` endpoint).
    pub url: Url,
    /// Long-lived access token. `None` is fine for cache-only commands.
    pub token: Option<SecretString>,
    /// Which entities commands are allowed to see.
    pub filter_mode: FilterMode,
    /// Directory holding the filter cache files.
    pub cache_dir: PathBuf,
    /// Upper bound on dial + authentication handshake.
    pub timeout: Duration,
}

impl ContextConfig {
    pub fn new(url: Url, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            url,
            token: None,
            filter_mode: FilterMode::default(),
            cache_dir: cache_dir.into(),
            timeout: hactl_api::DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
