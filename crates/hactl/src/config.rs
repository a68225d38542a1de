//! CLI-side configuration: the shared config crate plus flag overrides.
//!
//! Precedence, highest first: CLI flags (and the env vars clap binds to
//! them, `HASS_URL` / `HASS_TOKEN`), `HACTL_*` env vars, the config file,
//! built-in defaults.

use std::path::PathBuf;

use hactl_config::{Config, TokenSource};
use hactl_core::ContextConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file path honoring `--config`.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(hactl_config::config_path)
}

/// Load the config file and apply flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = hactl_config::load_config(Some(&config_path(global)))?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        cfg.url.clone_from(url);
    }
    if let Some(mode) = global.filter_mode {
        cfg.filter.mode = mode;
    }
    if let Some(ref dir) = global.cache_dir {
        cfg.cache_dir = Some(dir.clone());
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
}

/// Resolve the token through the full chain.
pub fn resolve_token(cfg: &Config, global: &GlobalOpts) -> Option<(SecretString, TokenSource)> {
    hactl_config::resolve_token(cfg, global.token.as_deref())
}

/// Build the per-invocation `ContextConfig`.
///
/// `needs_token` is false for cache-only commands; the credential chain
/// (which may hit the system keyring) is skipped for them entirely.
pub fn build_context_config(
    global: &GlobalOpts,
    needs_token: bool,
) -> Result<ContextConfig, CliError> {
    let cfg = load(global)?;
    let token = if needs_token {
        let (token, source) = resolve_token(&cfg, global).ok_or(CliError::NoCredentials)?;
        tracing::debug!(%source, "access token resolved");
        Some(token)
    } else {
        None
    };
    Ok(cfg.to_context_config(token)?)
}
