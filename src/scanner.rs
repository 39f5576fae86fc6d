//! # Metadata Scanner
//!
//! Sequential tag prober. References are queued with [`MetadataScanner::add`]
//! and handed to a [`Prober`] one at a time; the next reference is only
//! started once the current probe has finished (stream started, end of
//! stream, or error). At most one probe is ever in flight.
//!
//! ## Lifecycle
//!
//! ```text
//! idle --add()--> probing --finish, queue non-empty--> probing
//!                    |
//!                    +--finish, queue empty--> idle
//! ```
//!
//! Probe results come back as [`ProbeEvent`]s delivered on the engine's
//! event loop and fed to [`MetadataScanner::handle_event`], which returns
//! the collected tags when a probe finished successfully with something to
//! report. Failed or tagless probes are skipped silently and never retried.

use std::collections::VecDeque;

use log::debug;

use crate::types::Tags;

/// One-shot tag extraction pipeline.
pub trait Prober {
    /// Begin probing `reference`. Results arrive later as [`ProbeEvent`]s.
    fn start(&mut self, reference: &str);

    /// Release whatever the finished probe was holding.
    fn stop(&mut self) {}
}

/// Asynchronous notifications from a [`Prober`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// A batch of tags was found
    Tags { reference: String, tags: Tags },
    /// The stream is ready to play; tags seen so far are final
    StreamStarted { reference: String },
    /// The stream ended before starting
    EndOfStream { reference: String },
    /// The probe failed
    Error { reference: String, message: String },
}

impl ProbeEvent {
    pub fn reference(&self) -> &str {
        match self {
            ProbeEvent::Tags { reference, .. }
            | ProbeEvent::StreamStarted { reference }
            | ProbeEvent::EndOfStream { reference }
            | ProbeEvent::Error { reference, .. } => reference,
        }
    }
}

/// Queue-driven, one-at-a-time tag prober
#[derive(Debug)]
pub struct MetadataScanner<P> {
    prober: P,
    pending: VecDeque<String>,
    /// Reference being probed; `None` while idle
    current: Option<String>,
    collected: Tags,
}

impl<P: Prober> MetadataScanner<P> {
    pub fn new(prober: P) -> Self {
        Self {
            prober,
            pending: VecDeque::new(),
            current: None,
            collected: Tags::default(),
        }
    }

    /// Queue references for probing. Starts work if the scanner was idle.
    pub fn add<I, S>(&mut self, references: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(references.into_iter().map(Into::into));
        if self.current.is_none() {
            self.advance();
        }
    }

    /// True when no probe is in flight and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Feed a probe event.
    ///
    /// Returns `(reference, tags)` when a probe finished successfully with
    /// non-empty tags. Events for anything but the in-flight reference are
    /// ignored.
    pub fn handle_event(&mut self, event: ProbeEvent) -> Option<(String, Tags)> {
        if self.current.as_deref() != Some(event.reference()) {
            debug!("Ignoring probe event for {}", event.reference());
            return None;
        }

        match event {
            ProbeEvent::Tags { tags, .. } => {
                self.collected.merge(tags);
                None
            }
            ProbeEvent::StreamStarted { .. } | ProbeEvent::EndOfStream { .. } => self.finish(true),
            ProbeEvent::Error { reference, message } => {
                debug!("Probe failed for {reference}: {message}");
                self.finish(false)
            }
        }
    }

    fn finish(&mut self, success: bool) -> Option<(String, Tags)> {
        let tags = std::mem::take(&mut self.collected);
        let reference = self.current.take();
        self.prober.stop();
        self.advance();

        let reference = reference?;
        if success && !tags.is_empty() {
            debug!("Probe finished for {reference}");
            Some((reference, tags))
        } else {
            None
        }
    }

    fn advance(&mut self) {
        match self.pending.pop_front() {
            Some(reference) => {
                debug!("Probing {reference}");
                self.prober.start(&reference);
                self.current = Some(reference);
            }
            None => {
                self.current = None;
            }
        }
    }
}
