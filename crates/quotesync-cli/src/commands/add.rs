use std::path::Path;

use quotesync_core::catalog::add_quote;
use quotesync_core::sync::SyncOutcome;

use crate::commands::common::{
    build_engine, format_conflict_lines, load_config, open_store, print_event,
};
use crate::error::CliError;

pub async fn run_add(
    text_parts: &[String],
    category: &str,
    no_sync: bool,
    data_dir: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let quote = add_quote(&store, &text_parts.join(" "), category)?;
    println!("Added quote to '{}'", quote.category);
    drop(store);

    if no_sync {
        return Ok(());
    }

    let config = load_config(config_path)?;
    let engine = build_engine(data_dir, &config, Box::new(print_event))?;
    match engine.sync_now().await {
        Ok(SyncOutcome::Conflict(report)) => {
            for line in format_conflict_lines(&report) {
                println!("{line}");
            }
            println!("Run `quotesync sync --resolve <mode>` to settle it.");
        }
        Ok(_) => {}
        Err(error) => {
            tracing::warn!("Quote kept locally; sync failed: {}", error);
        }
    }

    Ok(())
}
