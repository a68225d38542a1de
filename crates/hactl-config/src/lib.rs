//! Configuration for the hactl CLI.
//!
//! TOML config file, `HACTL_` environment overrides, access-token
//! resolution (env + keyring + plaintext), and translation to
//! `hactl_core::ContextConfig`. The CLI layers its own flags on top.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hactl_core::{ContextConfig, DEFAULT_URL, FilterMode};

/// Keyring service name; the token is stored under [`KEYRING_USER`].
pub const KEYRING_SERVICE: &str = "hactl";
pub const KEYRING_USER: &str = "token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(String),

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
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Server base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Access token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default)]
    pub filter: FilterSettings,

    /// Filter cache directory. Defaults to the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Connect + handshake timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            token_env: None,
            filter: FilterSettings::default(),
            cache_dir: None,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterSettings {
    /// `exposed` (default) or `all`.
    #[serde(default)]
    pub mode: FilterMode,
}

fn default_url() -> String {
    DEFAULT_URL.into()
}
fn default_timeout() -> u64 {
    10
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "hactl")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hactl");
    p
}

/// Platform config directory (`~/.config/hactl` on Linux).
pub fn config_dir() -> PathBuf {
    project_dirs().map_or_else(dirs_fallback, |dirs| dirs.config_dir().to_path_buf())
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where the filter cache lives when `cache_dir` is not set.
pub fn default_cache_dir() -> PathBuf {
    config_dir()
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack: defaults, then the TOML file, then `HACTL_*`
/// variables (`HACTL_FILTER__MODE=all` sets `filter.mode`).
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HACTL_").split("__"))
}

/// Load the config from `path` (or the canonical path) plus environment.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let default_path = config_path();
    let path = path.unwrap_or(&default_path);
    let config: Config = figment(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Where a resolved token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// `--token` flag or `HASS_TOKEN`.
    Flag,
    /// The variable named by `token_env`.
    EnvVar(String),
    Keyring,
    ConfigFile,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => f.write_str("flag / HASS_TOKEN"),
            Self::EnvVar(name) => write!(f, "env ${name}"),
            Self::Keyring => f.write_str("system keyring"),
            Self::ConfigFile => f.write_str("config file (plaintext)"),
        }
    }
}

/// Resolve the access token.
///
/// Order: explicit value (CLI flag, which clap also fills from
/// `HASS_TOKEN`) → `token_env` → system keyring → plaintext `token`.
/// `None` when no step yields a token.
pub fn resolve_token(
    config: &Config,
    explicit: Option<&str>,
) -> Option<(SecretString, TokenSource)> {
    // 1. Flag / HASS_TOKEN
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Some((SecretString::from(token.to_owned()), TokenSource::Flag));
    }

    // 2. Configured env var
    if let Some(ref env_name) = config.token_env {
        if let Ok(val) = std::env::var(env_name) {
            if !val.is_empty() {
                return Some((SecretString::from(val), TokenSource::EnvVar(env_name.clone())));
            }
        }
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Some((SecretString::from(secret), TokenSource::Keyring));
        }
    }

    // 4. Plaintext in config
    config
        .token
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(|t| (SecretString::from(t.clone()), TokenSource::ConfigFile))
}

/// Store the token in the system keyring.
pub fn store_token(token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation to core config ──────────────────────────────────────

impl Config {
    /// Build a `ContextConfig` from this config and an already-resolved
    /// token.
    pub fn to_context_config(
        &self,
        token: Option<SecretString>,
    ) -> Result<ContextConfig, ConfigError> {
        let url: url::Url = self.url.parse().map_err(|e| ConfigError::Validation {
            field: "url".into(),
            reason: format!("'{}': {e}", self.url),
        })?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::Validation {
                field: "url".into(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let cache_dir = self.cache_dir.clone().unwrap_or_else(default_cache_dir);
        let mut cfg = ContextConfig::new(url, cache_dir)
            .with_filter_mode(self.filter.mode)
            .with_timeout(Duration::from_secs(self.timeout));
        cfg.token = token;
        Ok(cfg)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
