use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quotesync_core::catalog::seed_if_empty;
use quotesync_core::config::SyncConfig;
use quotesync_core::remote::HttpRemoteGateway;
use quotesync_core::store::{JsonFileStore, RecordStore};
use quotesync_core::sync::{ConflictReport, EngineOptions, SyncEngine, SyncEvent};
use quotesync_core::Quote;

use crate::error::CliError;

const APP_DIR_NAME: &str = "quotesync";
const CONFIG_FILE_NAME: &str = "config.json";
const PREVIEW_CHARS: usize = 72;

pub type EventSink = Box<dyn Fn(&SyncEvent)>;
pub type CliEngine = SyncEngine<JsonFileStore, HttpRemoteGateway, EventSink>;

pub fn resolve_data_dir(cli_data_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = cli_data_dir {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(CliError::NoPlatformDir("data"))
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_config {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(CliError::NoPlatformDir("config"))
}

/// Config file contents with `QUOTESYNC_*` environment overrides applied.
pub fn load_config(path: &Path) -> Result<SyncConfig, CliError> {
    let config = SyncConfig::load_from_path(path)?;
    Ok(config.apply_env_overrides(|name| env::var(name).ok())?)
}

pub fn open_store(data_dir: &Path) -> Result<JsonFileStore, CliError> {
    Ok(JsonFileStore::open(data_dir)?)
}

/// Load the collection, writing the starter quotes first if it is empty.
pub fn load_seeded(store: &JsonFileStore) -> Result<Vec<Quote>, CliError> {
    let seeded = seed_if_empty(store)?;
    if seeded > 0 {
        println!("Added {seeded} starter quotes.");
    }
    Ok(store.load()?)
}

pub fn build_engine(
    data_dir: &Path,
    config: &SyncConfig,
    sink: EventSink,
) -> Result<CliEngine, CliError> {
    let store = open_store(data_dir)?;
    let gateway = HttpRemoteGateway::from_config(config)?;
    tracing::debug!("Syncing against {}", gateway.endpoint());
    Ok(SyncEngine::new(
        store,
        gateway,
        sink,
        EngineOptions::from(config),
    )?)
}

pub fn print_event(event: &SyncEvent) {
    println!("{}", format_event_line(event));
}

pub fn format_event_line(event: &SyncEvent) -> String {
    format!("[{}] {}", event.status.as_str(), event.message)
}

pub fn format_quote_line(quote: &Quote) -> String {
    let id = quote
        .id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    format!(
        "{id:>5}  {:<14}  {}",
        quote.category,
        preview(&quote.text, PREVIEW_CHARS)
    )
}

pub fn format_conflict_lines(report: &ConflictReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (heading, changes) in [
        ("Local changes", &report.local_changes),
        ("Server changes", &report.server_changes),
    ] {
        lines.push(format!("{heading} ({}):", changes.len()));
        lines.extend(
            changes
                .iter()
                .map(|quote| format!("  {}", format_quote_line(quote))),
        );
    }
    lines
}

pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut truncated = collapsed
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    truncated.push_str("...");
    truncated
}
