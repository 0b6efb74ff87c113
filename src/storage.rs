//! Durable key/value storage behind the snapshot store.
//!
//! The engine never touches a concrete store; it is handed an
//! `Arc<dyn KeyValueStore>`. [`FileStore`] keeps everything in one JSON object
//! on disk so state survives restarts, [`MemoryStore`] is used in tests and
//! for throwaway sessions.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key/value capability the engine persists through.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    /// Returns error if the value could not be made durable.
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON file.
///
/// Every `set` re-reads the file, changes its one key, and writes the result
/// through a temporary sibling and a rename, so a crash mid-write leaves the
/// previous file intact and keys written by another process are kept.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store, loading the file if it exists.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or is not a JSON
    /// object of strings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, crate::error::EngineError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => parse_entries(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "opened state file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents, `None` when the file is missing or unreadable.
    fn read_disk(&self) -> Option<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to re-read state file");
                return None;
            }
        };
        match parse_entries(&content) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file is corrupt, rewriting");
                None
            }
        }
    }

    fn write_atomic(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Per-process name so concurrent writers never share a temp file.
        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", std::process::id()));
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&temp_path, &self.path)
    }
}

fn parse_entries(content: &str) -> serde_json::Result<BTreeMap<String, String>> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(content)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self.entries.lock();
        // Other processes may have written since; only `key` is ours to change.
        let mut merged = self.read_disk().unwrap_or_else(|| entries.clone());
        merged.insert(key.to_string(), value.to_string());
        self.write_atomic(&merged)?;
        *entries = merged;
        Ok(())
    }
}
