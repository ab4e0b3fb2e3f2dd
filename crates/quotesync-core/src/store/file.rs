//! JSON file record store.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use tempfile::NamedTempFile;

use super::RecordStore;
use crate::error::Result;
use crate::models::Quote;

const QUOTES_FILE_NAME: &str = "quotes.json";
const LOCK_FILE_NAME: &str = "quotes.lock";
const LAST_SYNC_FILE_NAME: &str = "last_sync_time";

/// `RecordStore` keeping each named blob in its own file under a directory.
///
/// Every write goes to a uniquely named temp file in the same directory that
/// is then renamed over the target, so a reader sees either the old or the
/// new collection. Collection writes hold an advisory lock on `quotes.lock`,
/// which serializes `update` across handles and processes sharing `dir`.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn quotes_path(&self) -> PathBuf {
        self.dir.join(QUOTES_FILE_NAME)
    }

    fn last_sync_path(&self) -> PathBuf {
        self.dir.join(LAST_SYNC_FILE_NAME)
    }

    fn lock_file(&self) -> Result<RwLock<File>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE_NAME))?;
        Ok(RwLock::new(file))
    }

    fn read_quotes(&self) -> Result<Vec<Quote>> {
        match fs::read_to_string(self.quotes_path()) {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn write_quotes(&self, quotes: &[Quote]) -> Result<()> {
        let serialized = serde_json::to_string_pretty(quotes)?;
        write_atomic(&self.dir, &self.quotes_path(), serialized.as_bytes())
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Quote>> {
        self.read_quotes()
    }

    fn save(&self, quotes: &[Quote]) -> Result<()> {
        let mut lock = self.lock_file()?;
        let _guard = lock.write()?;
        self.write_quotes(quotes)
    }

    fn update<F>(&self, apply: F) -> Result<Vec<Quote>>
    where
        F: FnOnce(&mut Vec<Quote>) -> Result<()>,
    {
        let mut lock = self.lock_file()?;
        let _guard = lock.write()?;
        let mut quotes = self.read_quotes()?;
        apply(&mut quotes)?;
        self.write_quotes(&quotes)?;
        Ok(quotes)
    }

    fn last_synced(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = match fs::read_to_string(self.last_sync_path()) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(error) => {
                tracing::warn!(
                    "Ignoring unreadable last sync time in {}: {}",
                    self.last_sync_path().display(),
                    error
                );
                Ok(None)
            }
        }
    }

    fn set_last_synced(&self, at: DateTime<Utc>) -> Result<()> {
        write_atomic(&self.dir, &self.last_sync_path(), at.to_rfc3339().as_bytes())
    }
}

fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}
