use std::path::Path;
use std::rc::Rc;

use quotesync_core::sync::{ResolutionMode, SyncEvent, SyncOutcome, SyncStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use crate::cli::ResolveArg;
use crate::commands::common::{
    build_engine, format_conflict_lines, load_config, print_event, CliEngine,
};
use crate::error::CliError;

/// What a line typed while watching asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchInput {
    SyncNow,
    Resolve(ResolutionMode),
    Unknown,
}

pub fn parse_watch_input(line: &str) -> WatchInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return WatchInput::SyncNow;
    }
    trimmed
        .parse::<ResolutionMode>()
        .map_or(WatchInput::Unknown, WatchInput::Resolve)
}

pub async fn run_watch(
    on_conflict: Option<ResolveArg>,
    interval: Option<u64>,
    data_dir: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if let Some(secs) = interval {
        config.interval_secs = secs;
        config = config.validated()?;
    }

    let conflict_seen = Rc::new(Notify::new());
    let sink_notify = Rc::clone(&conflict_seen);
    let engine = build_engine(
        data_dir,
        &config,
        Box::new(move |event: &SyncEvent| {
            print_event(event);
            if event.status == SyncStatus::Conflict {
                sink_notify.notify_one();
            }
        }),
    )?;

    println!(
        "Syncing with {} every {}s. Press Enter to sync now, type a resolution mode to settle a conflict, Ctrl-C to stop.",
        config.endpoint, config.interval_secs
    );

    let periodic = engine.run_periodic(std::future::pending());
    tokio::pin!(periodic);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            () = &mut periodic => break,
            result = tokio::signal::ctrl_c() => {
                result?;
                println!("Stopping.");
                break;
            }
            () = conflict_seen.notified() => {
                handle_conflict(&engine, on_conflict.map(ResolutionMode::from)).await;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_input(&engine, parse_watch_input(&line)).await,
                None => stdin_open = false,
            },
        }
    }

    Ok(())
}

async fn handle_conflict(engine: &CliEngine, mode: Option<ResolutionMode>) {
    if let Some(report) = engine.pending_conflict() {
        for line in format_conflict_lines(&report) {
            println!("{line}");
        }
    }

    match mode {
        Some(mode) => {
            if let Err(error) = engine.resolve(mode).await {
                tracing::warn!("Conflict resolution failed: {}", error);
            }
        }
        None => println!("Type keep-local, use-remote or merge to resolve."),
    }
}

async fn handle_input(engine: &CliEngine, input: WatchInput) {
    match input {
        WatchInput::SyncNow => match engine.sync_now().await {
            Ok(SyncOutcome::Skipped(reason)) => {
                tracing::info!("Sync not started: {:?}", reason);
            }
            Ok(_) => {}
            Err(error) => tracing::warn!("Manual sync failed: {}", error),
        },
        WatchInput::Resolve(mode) => {
            if let Err(error) = engine.resolve(mode).await {
                println!("{error}");
            }
        }
        WatchInput::Unknown => println!("Press Enter to sync, or type keep-local, use-remote or merge."),
    }
}
