//! Local quote operations that don't involve the remote: adding, browsing and
//! seeding the collection.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Result;
use crate::models::Quote;
use crate::store::RecordStore;
use crate::util::normalize_category;

/// Quotes written into an empty collection on first run.
pub const STARTER_QUOTES: [(&str, &str); 5] = [
    (
        "The only way to do great work is to love what you do.",
        "work",
    ),
    (
        "Life is what happens when you're busy making other plans.",
        "life",
    ),
    ("In the middle of difficulty lies opportunity.", "inspiration"),
    ("Simplicity is the ultimate sophistication.", "wisdom"),
    (
        "The journey of a thousand miles begins with one step.",
        "inspiration",
    ),
];

/// Validate a new quote and append it to the store.
///
/// The quote has no id until a sync pushes it.
pub fn add_quote<S: RecordStore>(store: &S, text: &str, category: &str) -> Result<Quote> {
    let quote = Quote::new(text, category)?;
    let added = quote.clone();
    store.update(move |quotes| {
        quotes.push(quote);
        Ok(())
    })?;
    tracing::info!("Added quote in category '{}'", added.category);
    Ok(added)
}

/// Distinct categories in the order they first appear.
pub fn categories(quotes: &[Quote]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for quote in quotes {
        if !seen.iter().any(|category| *category == quote.category) {
            seen.push(quote.category.clone());
        }
    }
    seen
}

/// Quotes in `category`, or all quotes when `category` is `None` or blank.
pub fn filter_by_category<'a>(quotes: &'a [Quote], category: Option<&str>) -> Vec<&'a Quote> {
    match category.and_then(normalize_category) {
        Some(wanted) => quotes
            .iter()
            .filter(|quote| quote.category == wanted)
            .collect(),
        None => quotes.iter().collect(),
    }
}

/// Pick a quote at random, optionally restricted to one category.
pub fn random_quote<'a>(quotes: &'a [Quote], category: Option<&str>) -> Option<&'a Quote> {
    random_quote_with(quotes, category, &mut rand::thread_rng())
}

pub fn random_quote_with<'a, R: Rng + ?Sized>(
    quotes: &'a [Quote],
    category: Option<&str>,
    rng: &mut R,
) -> Option<&'a Quote> {
    filter_by_category(quotes, category).choose(rng).copied()
}

/// Write the starter quotes if the store holds nothing yet.
///
/// Returns how many quotes were added.
pub fn seed_if_empty<S: RecordStore>(store: &S) -> Result<usize> {
    let mut added = 0;
    store.update(|quotes| {
        if !quotes.is_empty() {
            return Ok(());
        }
        for (text, category) in STARTER_QUOTES {
            quotes.push(Quote::new(text, category)?);
        }
        added = quotes.len();
        Ok(())
    })?;

    if added > 0 {
        tracing::debug!("Seeded {} starter quotes", added);
    }
    Ok(added)
}
