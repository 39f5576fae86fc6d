//! Change notifications
//!
//! The engine reports every observable change as an [`Event`] pushed into a
//! single [`NotificationSink`]. Events for one command arrive in a fixed
//! order (for example `Removed`, then `CurrentChanged`, then `StateChanged`)
//! and always after the change has been persisted.

use serde::{Deserialize, Serialize};

use crate::types::{PlaybackState, Tags, Track};

/// Events emitted by the queue engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Tracks inserted at `position`, in order
    Added { tracks: Vec<Track>, position: usize },

    /// Positions (in the pre-removal queue) that were removed
    Removed { positions: Vec<usize> },

    /// Queue emptied
    Cleared,

    /// Queue permuted; new queue is `old[positions[0]], old[positions[1]], ...`
    Reordered { positions: Vec<usize> },

    /// Cursor moved. `None` is the unset cursor
    CurrentChanged { old: Option<usize>, new: Option<usize> },

    /// Playback state transition
    StateChanged { old: PlaybackState, new: PlaybackState },

    /// New or changed tags for a reference
    TagChanged { reference: String, tags: Tags },
}

/// Receiver of engine notifications.
pub trait NotificationSink {
    /// Called once per event, in emission order.
    fn notify(&mut self, event: Event);

    /// Called when the idle signal flips (idle means state `Ready`).
    fn idle_changed(&mut self, _idle: bool) {}
}

/// Recording sink, handy for tests and embedding.
impl NotificationSink for Vec<Event> {
    fn notify(&mut self, event: Event) {
        self.push(event);
    }
}
