//! Clap derive structures for the `hactl` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hactl_core::FilterMode;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hactl -- Home Assistant from the command line
#[derive(Debug, Parser)]
#[command(
    name = "hactl",
    version,
    about = "Control Home Assistant from the command line",
    long_about = "A CLI for Home Assistant built on the WebSocket API.\n\n\
        Entity visibility follows the voice-assistant exposure settings:\n\
        run `hactl sync` after changing which entities are exposed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file path
    #[arg(long, env = "HACTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Home Assistant URL (overrides config)
    #[arg(long, short = 'u', env = "HASS_URL", global = true)]
    pub url: Option<String>,

    /// Long-lived access token
    #[arg(long, env = "HASS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Entity filter mode: exposed or all
    #[arg(long, global = true)]
    pub filter_mode: Option<FilterMode>,

    /// Filter cache directory
    #[arg(long, env = "HACTL_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Connect timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HACTL_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON (default)
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one item per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch assist-exposed entities and write the local filter cache
    Sync,

    /// Stream Home Assistant events
    Events(EventsArgs),

    /// List Home Assistant areas
    Area(AreaArgs),

    /// Query the local entity cache
    #[command(alias = "ent")]
    Entities(EntitiesArgs),

    /// Expose an entity to the voice assistant (requires filter mode 'all')
    Expose {
        /// Entity id, e.g. light.kitchen
        entity_id: String,
    },

    /// Hide an entity from the voice assistant (requires filter mode 'all')
    Unexpose {
        /// Entity id, e.g. light.kitchen
        entity_id: String,
    },

    /// Set an entity's friendly name (requires filter mode 'all')
    Rename {
        /// Entity id, e.g. light.kitchen
        entity_id: String,

        /// New friendly name
        name: String,
    },

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EVENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// Stream events until interrupted (Ctrl-C)
    Watch {
        /// Only this event type (e.g. state_changed)
        #[arg(long = "type", short = 't')]
        event_type: Option<String>,

        /// Only events about entities in this domain (e.g. light)
        #[arg(long, short = 'd')]
        domain: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AREAS / ENTITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AreaArgs {
    #[command(subcommand)]
    pub command: AreaCommand,
}

#[derive(Debug, Subcommand)]
pub enum AreaCommand {
    /// List all areas defined in Home Assistant
    #[command(alias = "ls")]
    List,
}

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    #[command(subcommand)]
    pub command: EntitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntitiesCommand {
    /// List exposed entities from the last sync (no connection needed)
    #[command(alias = "ls")]
    List {
        /// Only entities in this area (area id, case-insensitive)
        #[arg(long, short = 'a')]
        area: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration (secrets masked)
    Show,

    /// Set a configuration value
    Set {
        /// Config key: url, token_env, filter.mode, cache_dir, timeout
        key: String,

        /// Value to set
        value: String,
    },

    /// Store the access token in the system keyring
    SetToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_events_watch_filters() {
        let cli = Cli::try_parse_from([
            "hactl", "events", "watch", "--type", "state_changed", "--domain", "light",
        ])
        .unwrap();
        match cli.command {
            Command::Events(EventsArgs {
                command: EventsCommand::Watch { event_type, domain },
            }) => {
                assert_eq!(event_type.as_deref(), Some("state_changed"));
                assert_eq!(domain.as_deref(), Some("light"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_filter_mode() {
        let cli = Cli::try_parse_from(["hactl", "--filter-mode", "all", "sync"]).unwrap();
        assert_eq!(cli.global.filter_mode, Some(FilterMode::All));
        assert!(Cli::try_parse_from(["hactl", "--filter-mode", "bogus", "sync"]).is_err());
    }
}
