//! Background playback queue service.
//!
//! Core modules:
//! - [`engine`] - The queue engine: ordered queue, cursor, playback state, tag cache
//! - [`scanner`] - One-at-a-time metadata scanning
//! - [`store`] - Snapshot persistence
//! - [`events`] - Change notifications
//! - [`backend`] - Media backend capability
//!
//! ### Supporting Modules
//!
//! - [`probe`] - Tag probing of local files with lofty
//! - [`protocol`] - JSON-lines requests and responses
//! - [`service`] - Single-threaded message loop with idle shutdown
//! - [`config`] - Configuration and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//!
//! ## Quick Start Example
//!
//! ```
//! use myplay::{Event, MemoryStore, PlaybackState, QueueEngine, SilentBackend};
//! use myplay::scanner::Prober;
//!
//! struct NoTags;
//!
//! impl Prober for NoTags {
//!     fn start(&mut self, _reference: &str) {}
//! }
//!
//! let mut engine = QueueEngine::new(SilentBackend::new(), NoTags, Vec::<Event>::new(), MemoryStore::new());
//!
//! engine.add(vec!["file:///music/a.flac".into(), "file:///music/b.flac".into()], 0)?;
//! engine.set_current(Some(0), true)?;
//! assert_eq!(engine.state(), PlaybackState::Playing);
//!
//! engine.next();
//! assert_eq!(engine.current(), Some(1));
//! # Ok::<(), myplay::QueueError>(())
//! ```
//!
//! ## Ordering
//!
//! Every mutation validates first, then changes state, persists the snapshot,
//! emits its events and only then drives the backend. A rejected request
//! leaves no trace.

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod probe;
pub mod protocol;
pub mod scanner;
pub mod service;
pub mod store;
pub mod types;

pub use backend::{BackendEvent, MediaBackend, SilentBackend};
pub use engine::QueueEngine;
pub use error::{QueueError, Result};
pub use events::{Event, NotificationSink};
pub use scanner::{MetadataScanner, ProbeEvent, Prober};
pub use store::{FileStore, MemoryStore, PersistenceStore};
pub use types::{PlaybackState, Snapshot, Tags, Track};
