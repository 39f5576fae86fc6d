//! # Core Data Types
//!
//! Plain data shared by the engine, the scanner and the wire protocol:
//!
//! - [`Tags`]: descriptive metadata for a reference (title/artist/album)
//! - [`Track`]: a queue entry zipped with its best-known tags
//! - [`PlaybackState`]: the three-state playback machine
//! - [`Snapshot`]: the persisted `(queue, cursor)` pair

use serde::{Deserialize, Serialize};

/// Descriptive metadata for a track reference.
///
/// A `None` field means the value is unknown, which is different from an
/// empty string. A `Tags` with every field `None` is "no tags".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl Tags {
    /// True when no key is known.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none()
    }

    /// Overlay the known values of `other` onto `self`.
    ///
    /// Probes report tags in several batches; later batches win per key,
    /// keys a batch does not mention are kept.
    pub fn merge(&mut self, other: Tags) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.artist.is_some() {
            self.artist = other.artist;
        }
        if other.album.is_some() {
            self.album = other.album;
        }
    }
}

/// A queue entry as reported by `List` and the `Added` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub reference: String,
    pub tags: Tags,
}

/// Playback state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing playing; the engine is idle
    #[default]
    Ready,
    /// Backend is playing the current track
    Playing,
    /// Backend is paused on the current track
    Paused,
}

impl PlaybackState {
    /// The idle signal for process-lifecycle decisions.
    pub fn is_idle(self) -> bool {
        self == PlaybackState::Ready
    }
}

/// The persisted part of the engine: queue order and cursor.
///
/// Tags are deliberately absent; they are rescanned after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub queue: Vec<String>,
    #[serde(default)]
    pub current: Option<usize>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop a cursor that does not denote an element of `queue`.
    pub fn sanitized(mut self) -> Self {
        if self.current.is_some_and(|c| c >= self.queue.len()) {
            self.current = None;
        }
        self
    }
}
