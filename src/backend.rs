//! # Media Backend Interface
//!
//! The engine drives audio output through the [`MediaBackend`] trait and
//! never decodes anything itself. Backend requests return immediately; the
//! backend later reports what happened as a [`BackendEvent`] posted to the
//! same event loop the engine runs on.
//!
//! Every `load` carries a fresh load id, and every event names the load it
//! belongs to. Events can arrive after the engine has already moved on (a
//! late end-of-stream for a track that was replaced, possibly by another
//! copy of the same reference), so the engine compares the id with its
//! latest load before acting.

use log::info;

/// Single-track player driven by the engine.
pub trait MediaBackend {
    /// Replace the loaded reference. Does not start playback.
    ///
    /// Events about this stream must carry `load_id`.
    fn load(&mut self, reference: &str, load_id: u64);

    /// Start or resume playing the loaded reference.
    fn set_playing(&mut self);

    /// Pause the loaded reference.
    fn set_paused(&mut self);

    /// Stop output and forget the loaded reference.
    fn set_idle(&mut self);
}

/// Asynchronous notifications from a [`MediaBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// The reference played to its end
    EndOfStream { load_id: u64, reference: String },
    /// The backend failed on the reference
    Error { load_id: u64, reference: String, message: String },
    /// The backend started streaming the reference
    StreamStarted { load_id: u64, reference: String },
}

impl BackendEvent {
    /// Reference the event belongs to.
    pub fn reference(&self) -> &str {
        match self {
            BackendEvent::EndOfStream { reference, .. }
            | BackendEvent::Error { reference, .. }
            | BackendEvent::StreamStarted { reference, .. } => reference,
        }
    }

    /// Id of the `load` the event belongs to.
    pub fn load_id(&self) -> u64 {
        match self {
            BackendEvent::EndOfStream { load_id, .. }
            | BackendEvent::Error { load_id, .. }
            | BackendEvent::StreamStarted { load_id, .. } => *load_id,
        }
    }
}

/// Backend that accepts every transition and only logs it.
///
/// Used by the service binary, where decoding and audio output belong to an
/// external component. It never reports events on its own.
#[derive(Debug, Default)]
pub struct SilentBackend {
    loaded: Option<String>,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference currently loaded, if any
    pub fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }
}

impl MediaBackend for SilentBackend {
    fn load(&mut self, reference: &str, load_id: u64) {
        info!("Backend loading {reference} (load {load_id})");
        self.loaded = Some(reference.to_string());
    }

    fn set_playing(&mut self) {
        info!("Backend playing {}", self.loaded.as_deref().unwrap_or("<nothing>"));
    }

    fn set_paused(&mut self) {
        info!("Backend paused");
    }

    fn set_idle(&mut self) {
        info!("Backend idle");
        self.loaded = None;
    }
}
