use std::path::Path;

use quotesync_core::config::{ConflictPolicy, SyncConfig};

use crate::cli::ConfigCommands;
use crate::commands::common::load_config;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(config_path),
        ConfigCommands::Init {
            endpoint,
            user_id,
            interval_secs,
            auto_merge,
            force,
        } => {
            let config = build_init_config(endpoint, user_id, interval_secs, auto_merge)?;
            run_config_init(&config, force, config_path)
        }
    }
}

fn run_config_show(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        "defaults".to_string()
    };

    println!("# {source}");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn build_init_config(
    endpoint: Option<String>,
    user_id: Option<u64>,
    interval_secs: Option<u64>,
    auto_merge: bool,
) -> Result<SyncConfig, CliError> {
    let defaults = SyncConfig::default();
    let config = SyncConfig {
        endpoint: endpoint.unwrap_or(defaults.endpoint),
        user_id: user_id.unwrap_or(defaults.user_id),
        interval_secs: interval_secs.unwrap_or(defaults.interval_secs),
        policy: if auto_merge {
            ConflictPolicy::AutoMerge
        } else {
            defaults.policy
        },
        ..defaults
    };
    Ok(config.validated()?)
}

pub fn run_config_init(config: &SyncConfig, force: bool, config_path: &Path) -> Result<(), CliError> {
    if config_path.exists() && !force {
        return Err(CliError::ConfigExists(config_path.display().to_string()));
    }

    config.save_to_path(config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
