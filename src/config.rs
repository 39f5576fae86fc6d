//! # Configuration Module
//!
//! This module handles configuration management and data directory setup for
//! MyPlay. It provides the platform-appropriate location of the persisted
//! playlist and the runtime settings of the service.
//!
//! ## Data Storage
//!
//! MyPlay stores its playlist snapshot in the platform-standard data directory:
//! - Linux: `~/.local/share/myplay/playlist.json`
//! - macOS: `~/Library/Application Support/myplay/playlist.json`
//! - Windows: `%APPDATA%\myplay\playlist.json`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the persisted playlist inside the data directory
pub const PLAYLIST_FILE: &str = "playlist.json";

/// Seconds the service lingers while idle before exiting
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 500;

/// Returns the platform-appropriate data directory for MyPlay, creating it
/// if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The myplay subdirectory cannot be created due to permissions
///
/// # Examples
///
/// ```no_run
/// use myplay::config::get_data_dir;
///
/// let data_dir = get_data_dir()?;
/// println!("Playlist lives in {}", data_dir.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    ensure_dir(&data_dir.join("myplay"))
}

/// Returns the path of the persisted playlist snapshot.
pub fn get_playlist_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(PLAYLIST_FILE))
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| {
        format!(
            "Failed to create MyPlay data directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir.to_path_buf())
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory holding the playlist snapshot
    pub data_dir: PathBuf,
    /// Idle seconds before the service exits; 0 keeps it running
    pub idle_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: get_data_dir().unwrap_or_else(|_| PathBuf::from(".")),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl RuntimeConfig {
    /// Create a new runtime configuration in the platform data directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            data_dir: get_data_dir()?,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        })
    }

    /// Create configuration with an explicit data directory, creating it
    pub fn with_data_dir(data_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            data_dir: ensure_dir(&data_dir)?,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        })
    }

    /// Build from optional CLI overrides
    pub fn from_args(data_dir: Option<PathBuf>, idle_timeout_secs: Option<u64>) -> Result<Self> {
        let mut config = match data_dir {
            Some(dir) => Self::with_data_dir(dir)?,
            None => Self::new()?,
        };
        if let Some(secs) = idle_timeout_secs {
            config.idle_timeout_secs = secs;
        }
        Ok(config)
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.data_dir.join(PLAYLIST_FILE)
    }

    /// `None` when idle shutdown is disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
