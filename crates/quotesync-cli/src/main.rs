//! quotesync CLI - keep a local quote collection in sync from the terminal

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::browse::{run_categories, run_list, run_random};
use crate::commands::common::{resolve_config_path, resolve_data_dir};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVES: [&str; 2] = ["quotesync=info", "quotesync_core=info"];

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;
    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Commands::Add {
            text,
            category,
            no_sync,
        } => run_add(&text, &category, no_sync, &data_dir, &config_path).await?,
        Commands::List { category, json } => run_list(category.as_deref(), json, &data_dir)?,
        Commands::Random { category } => run_random(category.as_deref(), &data_dir)?,
        Commands::Categories => run_categories(&data_dir)?,
        Commands::Sync {
            resolve,
            auto_merge,
        } => run_sync(resolve, auto_merge, &data_dir, &config_path).await?,
        Commands::Watch {
            on_conflict,
            interval,
        } => run_watch(on_conflict, interval, &data_dir, &config_path).await?,
        Commands::Status { json } => run_status(json, &data_dir, &config_path)?,
        Commands::Config { command } => run_config(command, &config_path)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_LOG_DIRECTIVES {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
