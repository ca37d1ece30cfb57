//! Clap derive structures for the `homedeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// homedeck -- offline-capable CLI for Home Assistant hubs
#[derive(Debug, Parser)]
#[command(
    name = "homedeck",
    version,
    about = "Inspect and control Home Assistant entities from a local cache",
    long_about = "A companion CLI for Home Assistant hubs.\n\n\
        Entity states are mirrored into a local SQLite cache, so listing\n\
        and inspection keep working while the hub is unreachable. Commands\n\
        that change state need a live connection.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "HOMEDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Path to the entity cache database (overrides config)
    #[arg(long, env = "HOMEDECK_DB", global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HOMEDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "HOMEDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HOMEDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show hub connectivity and cache health
    #[command(alias = "st")]
    Status,

    /// Run a full entity sync against the hub
    Sync {
        /// Sync even if the cache is still fresh
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// List cached entities
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one entity in detail
    #[command(alias = "get")]
    Show {
        /// Entity ID (e.g. light.kitchen)
        entity_id: String,

        /// Fetch live state from the hub first
        #[arg(long, short = 'r')]
        refresh: bool,
    },

    /// Manage favorite entities
    #[command(alias = "fav")]
    Favorites(FavoritesArgs),

    /// Call a hub service (e.g. light toggle)
    Call(CallArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── List ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only entities from this domain (e.g. light, sensor)
    #[arg(long, short = 'd')]
    pub domain: Option<String>,

    /// Only entities assigned to this area
    #[arg(long)]
    pub area: Option<String>,
}

// ── Favorites ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: FavoritesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List favorite entities
    #[command(alias = "ls")]
    List,

    /// Mark an entity as favorite
    Add {
        /// Entity ID (e.g. light.kitchen)
        entity_id: String,
    },

    /// Unmark a favorite entity
    Remove {
        /// Entity ID (e.g. light.kitchen)
        entity_id: String,
    },

    /// Flip the favorite flag on an entity
    Toggle {
        /// Entity ID (e.g. light.kitchen)
        entity_id: String,
    },
}

// ── Call ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Service domain (e.g. light, switch, scene)
    pub domain: String,

    /// Service name (e.g. toggle, turn_on, press)
    pub service: String,

    /// Target entity ID
    #[arg(long, short = 'e')]
    pub entity: Option<String>,

    /// Extra service data as a JSON object
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter config file
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
