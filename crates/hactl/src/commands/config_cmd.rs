//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use hactl_config::{Config, FilterSettings};
use hactl_core::{DEFAULT_URL, FilterMode};
use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Resolved configuration for display. Secrets are masked.
#[derive(Debug, Serialize)]
struct ConfigView {
    config_file: PathBuf,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_env: Option<String>,
    token_source: Option<String>,
    filter_mode: FilterMode,
    cache_dir: PathBuf,
    timeout: u64,
}

fn format_view(view: &ConfigView) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "# {}", view.config_file.display());
    let _ = writeln!(out, "url = \"{}\"", view.url);
    if view.token.is_some() {
        let _ = writeln!(out, "token = \"****\"");
    }
    if let Some(ref env) = view.token_env {
        let _ = writeln!(out, "token_env = \"{env}\"");
    }
    let _ = writeln!(out, "cache_dir = \"{}\"", view.cache_dir.display());
    let _ = writeln!(out, "timeout = {}", view.timeout);
    let _ = writeln!(out);
    let _ = writeln!(out, "[filter]");
    let _ = writeln!(out, "mode = \"{}\"", view.filter_mode);
    let _ = writeln!(out);
    let _ = write!(
        out,
        "# token source: {}",
        view.token_source.as_deref().unwrap_or("none")
    );
    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_token() -> Result<String, CliError> {
    let token = rpassword::prompt_password("Long-lived access token: ").map_err(prompt_err)?;
    let token = token.trim().to_owned();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(token)
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path(global);
            eprintln!("hactl configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            // 1. Server URL
            let url: String = Input::new()
                .with_prompt("Home Assistant URL")
                .default(DEFAULT_URL.into())
                .interact_text()
                .map_err(prompt_err)?;
            let url = url.trim().trim_end_matches('/').to_owned();

            // 2. Token and where to keep it
            let token = prompt_token()?;
            let choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let selection = Select::new()
                .with_prompt("Where to store the token?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;
            let token_field = if selection == 0 {
                hactl_config::store_token(&token)?;
                eprintln!("   ✓ Token stored in system keyring");
                None
            } else {
                Some(token)
            };

            // 3. Filter mode
            let modes = &[
                "exposed: only entities exposed to the voice assistant (recommended)",
                "all: every entity, enables expose/unexpose/rename",
            ];
            let mode = match Select::new()
                .with_prompt("Entity filter mode")
                .items(modes)
                .default(0)
                .interact()
                .map_err(prompt_err)?
            {
                0 => FilterMode::Exposed,
                _ => FilterMode::All,
            };

            let cfg = Config {
                url,
                token: token_field,
                filter: FilterSettings { mode },
                ..Config::default()
            };
            cfg.to_context_config(None)?;
            hactl_config::save_config(&cfg, &config_path)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("\n  Next: hactl sync");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let source = config::resolve_token(&cfg, global).map(|(_, source)| source.to_string());
            let view = ConfigView {
                config_file: config::config_path(global),
                url: cfg.url.clone(),
                token: cfg.token.as_ref().map(|_| "****"),
                token_env: cfg.token_env.clone(),
                token_source: source,
                filter_mode: cfg.filter.mode,
                cache_dir: cfg
                    .cache_dir
                    .clone()
                    .unwrap_or_else(hactl_config::default_cache_dir),
                timeout: cfg.timeout,
            };
            let out = output::render_single(global.output, &view, format_view)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let path = config::config_path(global);
            let mut cfg = hactl_config::load_config(Some(&path))?;

            match key.as_str() {
                "url" => cfg.url = value,
                "token_env" | "token-env" => cfg.token_env = Some(value),
                "filter.mode" | "filter-mode" | "mode" => {
                    cfg.filter.mode = parse_value("filter.mode", &value, "'exposed' or 'all'")?;
                }
                "cache_dir" | "cache-dir" => cfg.cache_dir = Some(value.into()),
                "timeout" => cfg.timeout = parse_value("timeout", &value, "a number (seconds)")?,
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: url, token_env, \
                             filter.mode, cache_dir, timeout"
                        ),
                    });
                }
            }

            cfg.to_context_config(None)?;
            hactl_config::save_config(&cfg, &path)?;
            if !global.quiet {
                eprintln!("✓ Set {key}");
            }
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let token = prompt_token()?;
            hactl_config::store_token(&token)?;
            if !global.quiet {
                eprintln!("✓ Token stored in system keyring");
            }
            Ok(())
        }
    }
}
