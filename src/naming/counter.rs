//! Persisted counter for fallback page names
//!
//! Pages whose URL yields no usable file name are saved as `<n>.html`, where
//! `n` comes from a counter stored in a one-line state file under the storage
//! root. The counter is read, advanced by one and written back every time a
//! fallback name is handed out.
//!
//! The read-then-write sequence is not atomic: two processes sharing a
//! storage root may hand out the same number.

use crate::MirrorError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Value used when no valid counter has been stored yet
const FIRST_VALUE: u64 = 1;

/// Persistence boundary of the name counter
pub trait CounterStore: Send {
    /// Reads the raw stored content
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> io::Result<Option<String>>;

    /// Replaces the stored content with `value`
    fn save(&mut self, value: u64) -> io::Result<()>;

    /// Where the counter lives, for error reports
    fn location(&self) -> &Path;
}

/// Counter store backed by a plain text file
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CounterStore for FileCounterStore {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&mut self, value: u64) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, value.to_string())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// In-memory counter store
///
/// Clones share the same cell, so a test can keep a handle and inspect what
/// the mirror wrote.
#[derive(Debug, Clone)]
pub struct MemoryCounterStore {
    content: Arc<Mutex<Option<String>>>,
    fail_writes: bool,
    location: PathBuf,
}

impl MemoryCounterStore {
    /// Creates an empty store (as if the state file did not exist)
    pub fn new() -> Self {
        Self {
            content: Arc::new(Mutex::new(None)),
            fail_writes: false,
            location: PathBuf::from("<memory>"),
        }
    }

    /// Creates a store holding the given raw content
    pub fn with_content(content: &str) -> Self {
        let store = Self::new();
        store.set_content(content);
        store
    }

    /// Makes every subsequent write fail
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Raw content currently stored
    pub fn content(&self) -> Option<String> {
        self.content.lock().ok().and_then(|c| c.clone())
    }

    /// Overwrites the raw content, simulating an external edit
    pub fn set_content(&self, content: &str) {
        if let Ok(mut cell) = self.content.lock() {
            *cell = Some(content.to_string());
        }
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryCounterStore {
    fn load(&self) -> io::Result<Option<String>> {
        self.content
            .lock()
            .map(|c| c.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "counter cell poisoned"))
    }

    fn save(&mut self, value: u64) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "writes disabled",
            ));
        }
        let mut cell = self
            .content
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "counter cell poisoned"))?;
        *cell = Some(value.to_string());
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.location
    }
}

/// Hands out fallback page numbers
pub struct NameCounter {
    store: Box<dyn CounterStore>,
}

impl NameCounter {
    pub fn new(store: impl CounterStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Counter persisted in the file at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileCounterStore::new(path))
    }

    /// Reads the stored counter value
    ///
    /// A missing state file yields 1. Unreadable or corrupt content is
    /// reported and also yields 1, so a damaged state file never blocks a
    /// mirror.
    pub fn read_counter(&self) -> u64 {
        let content = match self.store.load() {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::debug!(
                    "No counter at {}; first nameless page will be named {}.html",
                    self.store.location().display(),
                    FIRST_VALUE
                );
                return FIRST_VALUE;
            }
            Err(e) => {
                tracing::error!(
                    "{}",
                    MirrorError::io(self.store.location().to_path_buf(), e)
                );
                return FIRST_VALUE;
            }
        };

        let first_line = content.lines().next().unwrap_or("").trim();
        match first_line.parse::<u64>() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "{}",
                    MirrorError::CounterCorruption {
                        path: self.store.location().to_path_buf(),
                        reason: format!("'{}': {}", first_line, e),
                    }
                );
                FIRST_VALUE
            }
        }
    }

    /// Stores a new counter value
    ///
    /// Failures are reported but never propagated: the caller already holds
    /// the name it needs.
    pub fn write_counter(&mut self, value: u64) {
        if let Err(e) = self.store.save(value) {
            tracing::error!(
                "Failed to persist name counter: {}",
                MirrorError::io(self.store.location().to_path_buf(), e)
            );
        }
    }

    /// Takes the current value and advances the stored counter by one
    pub fn next_value(&mut self) -> u64 {
        let value = self.read_counter();
        self.write_counter(value.saturating_add(1));
        value
    }
}

impl std::fmt::Debug for NameCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameCounter")
            .field("location", &self.store.location())
            .finish()
    }
}
