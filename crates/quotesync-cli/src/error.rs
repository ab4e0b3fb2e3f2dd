use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quotesync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to resolve the {0} directory for this platform")]
    NoPlatformDir(&'static str),
    #[error("Config file already exists at {0} (use --force to overwrite)")]
    ConfigExists(String),
    #[error("Sync stopped on a conflict. Re-run with --resolve keep-local|use-remote|merge")]
    UnresolvedConflict,
}
