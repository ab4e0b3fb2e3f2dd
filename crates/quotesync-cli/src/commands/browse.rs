use std::path::Path;

use quotesync_core::catalog::{categories, filter_by_category, random_quote};

use crate::commands::common::{format_quote_line, load_seeded, open_store};
use crate::error::CliError;

pub const NO_QUOTES_MESSAGE: &str = "No quotes found in this category.";

pub fn run_list(category: Option<&str>, as_json: bool, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let quotes = load_seeded(&store)?;
    let selected = filter_by_category(&quotes, category);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else if selected.is_empty() {
        println!("{NO_QUOTES_MESSAGE}");
    } else {
        for quote in selected {
            println!("{}", format_quote_line(quote));
        }
    }

    Ok(())
}

pub fn run_random(category: Option<&str>, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let quotes = load_seeded(&store)?;

    match random_quote(&quotes, category) {
        Some(quote) => println!("\"{}\"\n  - {}", quote.text, quote.category),
        None => println!("{NO_QUOTES_MESSAGE}"),
    }

    Ok(())
}

pub fn run_categories(data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let quotes = load_seeded(&store)?;

    for category in categories(&quotes) {
        println!("{category}");
    }

    Ok(())
}
