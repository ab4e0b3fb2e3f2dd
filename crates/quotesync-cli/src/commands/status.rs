use std::path::Path;

use chrono::{DateTime, Utc};
use quotesync_core::config::{ConflictPolicy, SyncConfig};
use quotesync_core::store::RecordStore;
use quotesync_core::Quote;
use serde::Serialize;

use crate::commands::common::{format_timestamp, load_config, open_store};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub endpoint: String,
    pub user_id: u64,
    pub interval_secs: u64,
    pub policy: ConflictPolicy,
    pub last_synced: Option<DateTime<Utc>>,
    pub quotes: usize,
    pub unsynced: usize,
}

impl StatusReport {
    pub fn new(config: &SyncConfig, quotes: &[Quote], last_synced: Option<DateTime<Utc>>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            user_id: config.user_id,
            interval_secs: config.interval_secs,
            policy: config.policy,
            last_synced,
            quotes: quotes.len(),
            unsynced: quotes.iter().filter(|quote| quote.id.is_none()).count(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Remote:      {} (user {})", self.endpoint, self.user_id),
            format!("Interval:    {}s", self.interval_secs),
            format!("Last synced: {}", format_timestamp(self.last_synced)),
            format!("Quotes:      {} ({} not yet pushed)", self.quotes, self.unsynced),
        ]
    }
}

pub fn run_status(as_json: bool, data_dir: &Path, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let store = open_store(data_dir)?;
    let report = StatusReport::new(&config, &store.load()?, store.last_synced()?);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }

    Ok(())
}
