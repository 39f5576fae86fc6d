//! # Playback Service
//!
//! Runs a [`QueueEngine`] behind the JSON-lines protocol.
//!
//! ## Architecture
//!
//! Everything the engine reacts to arrives as a [`Message`] on one
//! `std::sync::mpsc` channel and is handled on the thread that owns the
//! engine:
//!
//! - request lines, fed by a reader thread on stdin
//! - backend notifications
//! - probe results posted by the metadata prober
//!
//! Tag reads run on the prober's own worker thread. Their results are
//! queued behind whatever the engine is handling, so the engine never
//! re-enters itself and a slow file never holds up a request.
//!
//! ## Lifecycle
//!
//! The service stops when stdin closes, on [`Message::Shutdown`], or once
//! the engine has been idle (state `Ready`) for the configured timeout.
//! Becoming busy cancels the countdown.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::{BackendEvent, MediaBackend, SilentBackend};
use crate::config::RuntimeConfig;
use crate::engine::QueueEngine;
use crate::events::{Event, NotificationSink};
use crate::probe::LoftyProber;
use crate::protocol::{self, Envelope, Output};
use crate::scanner::{ProbeEvent, Prober};
use crate::store::{FileStore, PersistenceStore};

/// Mailbox message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// One request line
    Line(String),
    Backend(BackendEvent),
    Probe(ProbeEvent),
    Shutdown,
}

/// Writes events, idle changes and responses as JSON lines.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Serialize `output` as one line and flush.
    pub fn write(&mut self, output: &Output) -> Result<()> {
        serde_json::to_writer(&mut self.out, output).context("Failed to encode output line")?;
        self.out.write_all(b"\n").context("Failed to write output line")?;
        self.out.flush().context("Failed to flush output")?;
        Ok(())
    }

    fn write_logged(&mut self, output: &Output) {
        if let Err(e) = self.write(output) {
            error!("{e:#}");
        }
    }
}

impl<W: Write> NotificationSink for JsonLinesSink<W> {
    fn notify(&mut self, event: Event) {
        self.write_logged(&Output::Event { event });
    }

    fn idle_changed(&mut self, idle: bool) {
        self.write_logged(&Output::Idle { idle });
    }
}

/// Message loop around an engine.
pub struct Service<B, P, S, W> {
    engine: QueueEngine<B, P, JsonLinesSink<W>, S>,
    idle_timeout: Option<Duration>,
    idle_since: Option<Instant>,
}

impl<B, P, S, W> Service<B, P, S, W>
where
    B: MediaBackend,
    P: Prober,
    S: PersistenceStore,
    W: Write,
{
    /// `idle_timeout` of `None` keeps the service running while idle.
    pub fn new(engine: QueueEngine<B, P, JsonLinesSink<W>, S>, idle_timeout: Option<Duration>) -> Self {
        let idle_since = engine.is_idle().then(Instant::now);
        Self { engine, idle_timeout, idle_since }
    }

    pub fn engine(&self) -> &QueueEngine<B, P, JsonLinesSink<W>, S> {
        &self.engine
    }

    /// Handle one message. Returns `false` when the service should stop.
    pub fn handle(&mut self, message: Message) -> bool {
        match message {
            Message::Line(line) => self.handle_line(&line),
            Message::Backend(event) => self.engine.handle_backend_event(event),
            Message::Probe(event) => self.engine.handle_probe_event(event),
            Message::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        self.track_idle();
        true
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let output = match Envelope::parse(line) {
            Ok(Envelope { id, request }) => {
                debug!("Request {id:?}: {request:?}");
                match protocol::dispatch(&mut self.engine, request) {
                    Ok(reply) => Output::success(id, reply),
                    Err(e) => {
                        debug!("Request {id:?} rejected: {e}");
                        Output::failure(id, e)
                    }
                }
            }
            Err(e) => {
                warn!("Malformed request line: {e}");
                Output::failure(None, format!("Malformed request: {e}"))
            }
        };
        self.engine.sink_mut().write_logged(&output);
    }

    fn track_idle(&mut self) {
        if self.engine.is_idle() {
            self.idle_since.get_or_insert_with(Instant::now);
        } else {
            self.idle_since = None;
        }
    }

    /// Time left before idle shutdown, if a countdown is running
    fn remaining(&self) -> Option<Duration> {
        let timeout = self.idle_timeout?;
        let since = self.idle_since?;
        Some(timeout.saturating_sub(since.elapsed()))
    }

    /// Drain `rx` until shutdown, disconnection or idle timeout.
    pub fn run(&mut self, rx: &Receiver<Message>) {
        loop {
            let message = match self.remaining() {
                Some(remaining) if remaining.is_zero() => {
                    info!("Idle for {:?}, shutting down", self.idle_timeout.unwrap_or_default());
                    break;
                }
                Some(remaining) => match rx.recv_timeout(remaining) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            if !self.handle(message) {
                break;
            }
        }
    }
}

/// Forward stdin lines into the mailbox, then request shutdown at end of input.
fn spawn_stdin_reader(tx: Sender<Message>) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Message::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {e}");
                        break;
                    }
                }
            }
            debug!("stdin closed");
            let _ = tx.send(Message::Shutdown);
        })
        .context("Failed to spawn stdin reader")
}

/// Run the service on stdin/stdout until shutdown.
pub fn run(config: &RuntimeConfig) -> Result<()> {
    info!("Starting playback service (data dir {})", config.data_dir.display());

    let (tx, rx) = mpsc::channel();
    let probe_tx = tx.clone();
    let prober = LoftyProber::new(move |event| {
        if probe_tx.send(Message::Probe(event)).is_err() {
            debug!("Dropping probe event, service is gone");
        }
    })?;

    let engine = QueueEngine::new(
        SilentBackend::new(),
        prober,
        JsonLinesSink::new(io::stdout()),
        FileStore::new(config.playlist_path()),
    );

    let _reader = spawn_stdin_reader(tx)?;
    let mut service = Service::new(engine, config.idle_timeout());
    service.run(&rx);

    info!("Playback service stopped");
    Ok(())
}
