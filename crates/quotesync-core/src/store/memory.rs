//! In-process record store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::RecordStore;
use crate::error::Result;
use crate::models::Quote;

/// `RecordStore` backed by process memory, used by tests and embedders that
/// persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    quotes: Mutex<Vec<Quote>>,
    last_synced: Mutex<Option<DateTime<Utc>>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `quotes`.
    #[must_use]
    pub fn with_quotes(quotes: Vec<Quote>) -> Self {
        Self {
            quotes: Mutex::new(quotes),
            ..Self::default()
        }
    }

    /// Number of collection writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Vec<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, quotes: &[Quote]) -> Result<()> {
        *self.quotes.lock().unwrap_or_else(PoisonError::into_inner) = quotes.to_vec();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<Vec<Quote>>
    where
        F: FnOnce(&mut Vec<Quote>) -> Result<()>,
    {
        let mut guard = self.quotes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        apply(&mut next)?;
        guard.clone_from(&next);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(next)
    }

    fn last_synced(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(*self
            .last_synced
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }

    fn set_last_synced(&self, at: DateTime<Utc>) -> Result<()> {
        *self
            .last_synced
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(at);
        Ok(())
    }
}
