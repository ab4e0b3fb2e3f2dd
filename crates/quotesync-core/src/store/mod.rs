//! Local record storage
//!
//! The sync engine only ever sees whole collections: a store hands out a full
//! snapshot on `load` and replaces the full collection on `save`/`update`.

mod file;
mod memory;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Quote;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Trait for quote collection storage operations
pub trait RecordStore {
    /// Load the full collection
    fn load(&self) -> Result<Vec<Quote>>;

    /// Replace the full collection
    fn save(&self, quotes: &[Quote]) -> Result<()>;

    /// Read, modify and write the collection as one step.
    ///
    /// When `apply` fails nothing is written. Returns the collection as saved.
    fn update<F>(&self, apply: F) -> Result<Vec<Quote>>
    where
        F: FnOnce(&mut Vec<Quote>) -> Result<()>;

    /// Time of the last successful sync, if any
    fn last_synced(&self) -> Result<Option<DateTime<Utc>>>;

    /// Record the time of a successful sync
    fn set_last_synced(&self, at: DateTime<Utc>) -> Result<()>;
}
