//! # Snapshot Persistence
//!
//! The engine saves its `(queue, cursor)` snapshot after every successful
//! mutation and loads it once at construction. Two stores are provided:
//!
//! - [`FileStore`]: JSON file in the data directory, replaced atomically
//! - [`MemoryStore`]: in-process store for tests and embedding
//!
//! ## Failure Policy
//!
//! Stores report failures as `anyhow` errors. The engine logs them and
//! carries on: a load failure means "start empty", a save failure leaves
//! the in-memory state authoritative until the next successful save.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::types::Snapshot;

/// Load/save of the engine snapshot.
pub trait PersistenceStore {
    /// Read the stored snapshot. `Ok(None)` when nothing is stored.
    fn load(&mut self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot. An empty snapshot removes the stored data.
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// JSON snapshot file.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so a crash never leaves a half-written file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed empty playlist {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove playlist file {}", self.path.display())
            }),
        }
    }
}

impl PersistenceStore for FileStore {
    fn load(&mut self) -> Result<Option<Snapshot>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read playlist file {}", self.path.display())
                })
            }
        };

        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Corrupt playlist file {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.is_empty() {
            return self.remove();
        }

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        let file = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        {
            let mut writer = BufWriter::new(file.as_file());
            serde_json::to_writer(&mut writer, snapshot).context("Failed to encode playlist")?;
            writer.flush().context("Failed to write playlist")?;
        }
        file.as_file().sync_all().context("Failed to sync playlist")?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to replace playlist file {}", self.path.display()))?;

        debug!("Saved {} tracks to {}", snapshot.queue.len(), self.path.display());
        Ok(())
    }
}

/// Snapshot kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<Snapshot>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `snapshot`, as if saved by an earlier run.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self { snapshot: Some(snapshot), saves: 0 }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Number of `save` calls so far
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl PersistenceStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.saves += 1;
        self.snapshot = if snapshot.is_empty() { None } else { Some(snapshot.clone()) };
        Ok(())
    }
}
