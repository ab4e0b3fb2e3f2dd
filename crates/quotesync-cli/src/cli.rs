use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use quotesync_core::sync::ResolutionMode;

#[derive(Parser)]
#[command(name = "quotesync")]
#[command(about = "Keep a local quote collection in sync with a remote collection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the local quote collection
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a quote to the local collection
    #[command(alias = "new")]
    Add {
        /// Quote text
        #[arg(required = true)]
        text: Vec<String>,
        /// Quote category
        #[arg(short, long)]
        category: String,
        /// Skip the sync attempt after adding
        #[arg(long)]
        no_sync: bool,
    },
    /// List quotes
    List {
        /// Only show quotes in this category
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a random quote
    Random {
        /// Only pick from this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List categories in first-seen order
    Categories,
    /// Run one sync cycle now
    Sync {
        /// Resolve a conflict with this mode instead of stopping
        #[arg(long, value_enum, value_name = "MODE")]
        resolve: Option<ResolveArg>,
        /// Merge by id, newest change winning, instead of stopping on conflict
        #[arg(long, conflicts_with = "resolve")]
        auto_merge: bool,
    },
    /// Sync periodically until interrupted; press Enter to sync immediately
    Watch {
        /// Resolve conflicts with this mode as they happen
        #[arg(long, value_enum, value_name = "MODE")]
        on_conflict: Option<ResolveArg>,
        /// Seconds between sync attempts (overrides config)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Show last sync time and the configured remote
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completion script for
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Write completion output to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config
    Show,
    /// Write a config file
    Init {
        /// Remote collection endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Owner id sent with every request
        #[arg(long)]
        user_id: Option<u64>,
        /// Seconds between scheduled syncs
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Merge automatically instead of stopping on conflicts
        #[arg(long)]
        auto_merge: bool,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ResolveArg {
    KeepLocal,
    UseRemote,
    Merge,
}

impl From<ResolveArg> for ResolutionMode {
    fn from(arg: ResolveArg) -> Self {
        match arg {
            ResolveArg::KeepLocal => Self::KeepLocal,
            ResolveArg::UseRemote => Self::UseRemote,
            ResolveArg::Merge => Self::Merge,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
