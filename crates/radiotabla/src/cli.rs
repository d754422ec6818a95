//! Clap derive structures for the `radiotabla` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Depends only on clap so `build.rs` can render man pages from it.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// radiotabla -- Sveriges Radio schedules in the terminal
#[derive(Debug, Parser)]
#[command(
    name = "radiotabla",
    version,
    about = "Browse Sveriges Radio channel schedules from the command line",
    long_about = "Lists Sveriges Radio channels and shows what airs on them within\n\
        twelve hours of now. Schedules are fetched once per channel and kept\n\
        fresh by a periodic refresh while `watch` runs.",
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
    /// Schedule API base URL (overrides config)
    #[arg(long, env = "RADIOTABLA_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format (overrides config)
    #[arg(long, short = 'o', env = "RADIOTABLA_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output (overrides config)
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "RADIOTABLA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Channel display group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BucketArg {
    P1,
    P2,
    P3,
    P4,
    Other,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List channels grouped by P1, P2, P3, P4 and Other
    #[command(alias = "ch")]
    Channels(ChannelsArgs),

    /// Show a channel's schedule around now, or for a given day
    #[command(alias = "s")]
    Schedule(ScheduleArgs),

    /// Follow a channel's schedule, refreshing periodically until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Refresh the channel list and tracked schedules once, print the report
    Refresh(RefreshArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Channels ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChannelsArgs {
    /// Only list channels in this group
    #[arg(long, short = 'b', value_enum)]
    pub bucket: Option<BucketArg>,
}

// ── Schedule ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Channel ID (defaults to `favorite_channel` from config)
    pub channel: Option<u32>,

    /// Fetch this day's page only (YYYY-MM-DD); programs are still limited
    /// to twelve hours either side of now
    #[arg(long, short = 'd')]
    pub date: Option<String>,

    /// Hide programs that have already ended
    #[arg(long)]
    pub upcoming: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Channel ID (defaults to `favorite_channel` from config)
    pub channel: Option<u32>,

    /// Seconds between refreshes (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Refresh ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Load these channels first so the refresh revisits them
    #[arg(long = "channel", short = 'c', value_delimiter = ',')]
    pub channels: Vec<u32>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Channel to use when none is given
        #[arg(long)]
        favorite: Option<u32>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

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
