use std::path::Path;

use quotesync_core::config::ConflictPolicy;
use quotesync_core::sync::SyncOutcome;

use crate::cli::ResolveArg;
use crate::commands::common::{build_engine, format_conflict_lines, load_config, print_event};
use crate::error::CliError;

pub async fn run_sync(
    resolve: Option<ResolveArg>,
    auto_merge: bool,
    data_dir: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if auto_merge {
        config.policy = ConflictPolicy::AutoMerge;
    }

    let engine = build_engine(data_dir, &config, Box::new(print_event))?;
    match engine.sync_now().await? {
        SyncOutcome::Conflict(report) => {
            for line in format_conflict_lines(&report) {
                println!("{line}");
            }
            let Some(mode) = resolve else {
                return Err(CliError::UnresolvedConflict);
            };
            engine.resolve(mode.into()).await?;
        }
        SyncOutcome::Synced(_) | SyncOutcome::Skipped(_) => {}
    }

    Ok(())
}
