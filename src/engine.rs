//! # Playback Queue Engine
//!
//! [`QueueEngine`] is the single owner of the play queue, the current-track
//! cursor, the playback state and the tag cache. It validates commands,
//! mutates state, persists the snapshot, emits events and drives the media
//! backend, in that order.
//!
//! ## Ordering
//!
//! For every mutating command:
//!
//! 1. validation (failure leaves everything untouched)
//! 2. mutation of queue/cursor
//! 3. synchronous save of the snapshot
//! 4. events, in a fixed order (`Removed` → `CurrentChanged` → `StateChanged`)
//! 5. backend requests, which return immediately
//!
//! A client seeing an event can therefore rely on the change already being
//! durable and visible through [`list`](QueueEngine::list),
//! [`current`](QueueEngine::current) and [`state`](QueueEngine::state).
//!
//! ## Playback State Machine
//!
//! ```text
//!          play()             pause()
//! Ready ----------> Playing ----------> Paused
//!   ^                 |  ^                 |
//!   |     stop()      |  +----- play() ----+
//!   +-----------------+                    |
//!   +----------------- stop() -------------+
//! ```
//!
//! Cursor moves interact with the state: unsetting the cursor, or moving it
//! while paused, stops playback; moving it while playing reloads the backend
//! with the new reference and stays in `Playing` without a `StateChanged`.
//!
//! ## Asynchronous Input
//!
//! Backend and scanner results arrive through
//! [`handle_backend_event`](QueueEngine::handle_backend_event) and
//! [`handle_probe_event`](QueueEngine::handle_probe_event) on the same
//! thread as commands. Every backend load gets a new load id; backend
//! events carrying any other id are dropped, even when the queue holds the
//! same reference twice.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, error, info, warn};

use crate::backend::{BackendEvent, MediaBackend};
use crate::error::{QueueError, Result};
use crate::events::{Event, NotificationSink};
use crate::scanner::{MetadataScanner, ProbeEvent, Prober};
use crate::store::PersistenceStore;
use crate::types::{PlaybackState, Snapshot, Tags, Track};

/// Play queue, cursor and playback state machine
pub struct QueueEngine<B, P, N, S> {
    queue: Vec<String>,
    current: Option<usize>,
    state: PlaybackState,
    tags: HashMap<String, Tags>,
    /// Reference the backend holds; `None` after a stop
    loaded: Option<String>,
    /// Id handed to the backend with the latest load
    load_id: u64,
    idle: bool,
    backend: B,
    scanner: MetadataScanner<P>,
    sink: N,
    store: S,
}

impl<B, P, N, S> QueueEngine<B, P, N, S>
where
    B: MediaBackend,
    P: Prober,
    N: NotificationSink,
    S: PersistenceStore,
{
    /// Build an engine, restoring the queue and cursor from `store`.
    ///
    /// A missing or unreadable snapshot yields an empty queue. Every
    /// restored reference is submitted for tag scanning.
    pub fn new(backend: B, prober: P, sink: N, mut store: S) -> Self {
        let snapshot = match store.load() {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                warn!("Starting with an empty queue: {e:#}");
                Snapshot::default()
            }
        };
        let snapshot = snapshot.sanitized();
        info!(
            "Restored {} tracks, current {:?}",
            snapshot.queue.len(),
            snapshot.current
        );

        let mut engine = Self {
            queue: snapshot.queue,
            current: snapshot.current,
            state: PlaybackState::Ready,
            tags: HashMap::new(),
            loaded: None,
            load_id: 0,
            idle: true,
            backend,
            scanner: MetadataScanner::new(prober),
            sink,
            store,
        };
        let restored = engine.queue.clone();
        engine.scan_untagged(&restored);
        engine
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Queue zipped with best-known tags (empty tags if not yet scanned).
    pub fn list(&self) -> Vec<Track> {
        self.queue.iter().map(|r| self.track(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cursor position; `None` when unset.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True whenever the state is `Ready`.
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Cached tags for `reference`, if it has been scanned.
    pub fn tags(&self, reference: &str) -> Option<&Tags> {
        self.tags.get(reference)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { queue: self.queue.clone(), current: self.current }
    }

    /// Id of the load the backend currently holds; `None` after a stop.
    pub fn load_id(&self) -> Option<u64> {
        self.loaded.as_ref().map(|_| self.load_id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scanner(&self) -> &MetadataScanner<P> {
        &self.scanner
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Queue commands
    // ---------------------------------------------------------------------

    /// Insert `references` at `position` (in `0..=len`), keeping their order.
    ///
    /// Appending is `position == len`; there is no sentinel position.
    pub fn add(&mut self, references: Vec<String>, position: usize) -> Result<()> {
        if references.is_empty() {
            return Err(QueueError::EmptySequence);
        }
        if position > self.queue.len() {
            return Err(QueueError::InvalidPosition(position));
        }

        let count = references.len();
        let tail = self.queue.split_off(position);
        self.queue.extend(references.iter().cloned());
        self.queue.extend(tail);
        if let Some(c) = self.current.filter(|&c| c >= position) {
            self.current = Some(c + count);
        }
        debug!("Added {count} tracks at {position}");

        self.persist();
        let tracks = references.iter().map(|r| self.track(r)).collect();
        self.emit(Event::Added { tracks, position });
        self.scan_untagged(&references);
        Ok(())
    }

    /// Remove every position in `positions` in one step.
    ///
    /// All indices refer to the queue before removal. Removing the current
    /// track unsets the cursor, which stops playback if it was active.
    pub fn remove(&mut self, positions: Vec<usize>) -> Result<()> {
        if positions.is_empty() {
            return Err(QueueError::EmptySequence);
        }
        if let Some(&bad) = positions.iter().find(|&&p| p >= self.queue.len()) {
            return Err(QueueError::InvalidPosition(bad));
        }

        let removed: BTreeSet<usize> = positions.into_iter().collect();
        let old_queue = std::mem::take(&mut self.queue);
        self.queue = old_queue
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(i))
            .map(|(_, r)| r)
            .collect();

        let lost_current = self.current.filter(|c| removed.contains(c));
        self.current = match (self.current, lost_current) {
            (Some(_), Some(_)) | (None, _) => None,
            (Some(c), None) => Some(c - removed.range(..c).count()),
        };
        debug!("Removed {} tracks", removed.len());

        self.persist();
        self.emit(Event::Removed { positions: removed.into_iter().collect() });
        if lost_current.is_some() {
            self.current_changed(lost_current, None);
        }
        Ok(())
    }

    /// Empty the queue and unset the cursor.
    pub fn clear(&mut self) {
        let old = self.current.take();
        self.queue.clear();
        debug!("Cleared queue");

        self.persist();
        self.emit(Event::Cleared);
        if old.is_some() {
            self.current_changed(old, None);
        }
    }

    /// Permute the queue: the new queue is `old[positions[0]], old[positions[1]], ...`.
    ///
    /// The cursor follows its track silently; playback is not interrupted.
    pub fn reorder(&mut self, positions: Vec<usize>) -> Result<()> {
        if positions.is_empty() {
            return Err(QueueError::EmptySequence);
        }
        if positions.len() != self.queue.len() {
            return Err(QueueError::InvalidLength {
                expected: self.queue.len(),
                actual: positions.len(),
            });
        }
        let mut seen = HashSet::with_capacity(positions.len());
        for &p in &positions {
            if p >= self.queue.len() || !seen.insert(p) {
                return Err(QueueError::InvalidPosition(p));
            }
        }

        self.queue = positions.iter().map(|&p| self.queue[p].clone()).collect();
        if let Some(c) = self.current {
            self.current = positions.iter().position(|&p| p == c);
        }
        debug!("Reordered queue, current now {:?}", self.current);

        self.persist();
        self.emit(Event::Reordered { positions });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Cursor commands
    // ---------------------------------------------------------------------

    /// Move the cursor to `position` (`None` unsets it), then optionally play.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidPosition`] unless `position` is `None` or an
    /// index into the queue.
    pub fn set_current(&mut self, position: Option<usize>, also_play: bool) -> Result<()> {
        if let Some(p) = position.filter(|&p| p >= self.queue.len()) {
            return Err(QueueError::InvalidPosition(p));
        }

        if position != self.current {
            let old = std::mem::replace(&mut self.current, position);
            self.persist();
            self.current_changed(old, position);
        }

        if also_play {
            self.play();
        }
        Ok(())
    }

    /// Step the cursor forward. Does not start playback.
    pub fn next(&mut self) {
        let Some(c) = self.current else { return };
        if c + 1 < self.queue.len() {
            self.step_to(c + 1);
        }
    }

    /// Step the cursor back. Does not start playback.
    pub fn previous(&mut self) {
        let Some(c) = self.current else { return };
        if c > 0 {
            self.step_to(c - 1);
        }
    }

    fn step_to(&mut self, position: usize) {
        // In range by construction
        if let Err(e) = self.set_current(Some(position), false) {
            error!("Cursor step to {position} rejected: {e}");
        }
    }

    // ---------------------------------------------------------------------
    // Playback commands
    // ---------------------------------------------------------------------

    /// Start or resume playback.
    ///
    /// With no cursor, selects the first track; with an empty queue this is
    /// a no-op.
    pub fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        if self.current.is_none() {
            if self.queue.is_empty() {
                return;
            }
            self.step_to(0);
        }
        let Some(reference) = self.current.map(|c| self.queue[c].clone()) else {
            return;
        };

        if self.state == PlaybackState::Ready {
            self.load(reference);
        }
        self.backend.set_playing();
        self.change_state(PlaybackState::Playing);
    }

    /// Pause; only meaningful while playing.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.backend.set_paused();
        self.change_state(PlaybackState::Paused);
    }

    /// Stop and unload; only meaningful while playing or paused.
    ///
    /// The cursor is left where it is.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Ready {
            return;
        }
        self.backend.set_idle();
        self.loaded = None;
        self.change_state(PlaybackState::Ready);
    }

    // ---------------------------------------------------------------------
    // Asynchronous input
    // ---------------------------------------------------------------------

    /// React to a backend notification.
    ///
    /// End of stream advances to the next track and keeps playing (only
    /// `CurrentChanged` is emitted); on the last track it stops. Errors stop
    /// playback.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        let current_load = self.loaded.as_deref().map(|r| (self.load_id, r));
        if current_load != Some((event.load_id(), event.reference())) {
            debug!(
                "Ignoring stale backend event for {} (load {})",
                event.reference(),
                event.load_id()
            );
            return;
        }

        match event {
            BackendEvent::EndOfStream { reference, .. } => {
                debug!("End of stream: {reference}");
                match self.current {
                    Some(c) if c + 1 < self.queue.len() => self.step_to(c + 1),
                    _ => self.stop(),
                }
            }
            BackendEvent::Error { reference, message, .. } => {
                warn!("Backend error on {reference}: {message}");
                self.stop();
            }
            BackendEvent::StreamStarted { reference, .. } => {
                debug!("Stream started: {reference}");
            }
        }
    }

    /// Feed a probe notification to the scanner; emits `TagChanged` when a
    /// finished probe produced tags different from the cached ones.
    pub fn handle_probe_event(&mut self, event: ProbeEvent) {
        let Some((reference, tags)) = self.scanner.handle_event(event) else {
            return;
        };
        if self.tags.get(&reference) == Some(&tags) {
            return;
        }

        debug!("Tags for {reference}: {tags:?}");
        self.tags.insert(reference.clone(), tags.clone());
        self.emit(Event::TagChanged { reference, tags });
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Emit `CurrentChanged` and apply its consequences for playback.
    fn current_changed(&mut self, old: Option<usize>, new: Option<usize>) {
        self.emit(Event::CurrentChanged { old, new });

        match (new, self.state) {
            (None, _) | (_, PlaybackState::Paused) => self.stop(),
            (Some(p), PlaybackState::Playing) => {
                let reference = self.queue[p].clone();
                self.load(reference);
                self.backend.set_playing();
            }
            (Some(_), PlaybackState::Ready) => {}
        }
    }

    fn load(&mut self, reference: String) {
        self.load_id += 1;
        self.backend.load(&reference, self.load_id);
        self.loaded = Some(reference);
    }

    fn change_state(&mut self, new: PlaybackState) {
        let old = self.state;
        if old == new {
            return;
        }
        info!("Playback state {old:?} -> {new:?}");
        self.state = new;
        self.emit(Event::StateChanged { old, new });

        let idle = new.is_idle();
        if idle != self.idle {
            self.idle = idle;
            self.sink.idle_changed(idle);
        }
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save(&snapshot) {
            error!("Failed to save playlist: {e:#}");
        }
    }

    fn emit(&mut self, event: Event) {
        self.sink.notify(event);
    }

    fn track(&self, reference: &str) -> Track {
        Track {
            reference: reference.to_string(),
            tags: self.tags.get(reference).cloned().unwrap_or_default(),
        }
    }

    /// Submit references without cached tags, once each.
    fn scan_untagged(&mut self, references: &[String]) {
        let mut seen = HashSet::new();
        let untagged: Vec<String> = references
            .iter()
            .filter(|r| !self.tags.contains_key(*r) && seen.insert(r.as_str()))
            .cloned()
            .collect();
        if !untagged.is_empty() {
            self.scanner.add(untagged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Load(String),
        Playing,
        Paused,
        Idle,
    }

    #[derive(Debug, Default)]
    struct FakeBackend {
        calls: Vec<Call>,
    }

    impl MediaBackend for FakeBackend {
        fn load(&mut self, reference: &str, _load_id: u64) {
            self.calls.push(Call::Load(reference.to_string()));
        }
        fn set_playing(&mut self) {
            self.calls.push(Call::Playing);
        }
        fn set_paused(&mut self) {
            self.calls.push(Call::Paused);
        }
        fn set_idle(&mut self) {
            self.calls.push(Call::Idle);
        }
    }

    #[derive(Debug, Default)]
    struct FakeProber {
        started: Vec<String>,
    }

    impl Prober for FakeProber {
        fn start(&mut self, reference: &str) {
            self.started.push(reference.to_string());
        }
    }

    type TestEngine = QueueEngine<FakeBackend, FakeProber, Vec<Event>, MemoryStore>;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_engine() -> TestEngine {
        QueueEngine::new(
            FakeBackend::default(),
            FakeProber::default(),
            Vec::new(),
            MemoryStore::new(),
        )
    }

    /// Engine holding `items`, with recorded events and calls cleared
    fn engine_with(items: &[&str]) -> TestEngine {
        let mut engine = create_test_engine();
        engine.add(refs(items), 0).expect("add should succeed");
        engine.sink_mut().clear();
        engine.backend.calls.clear();
        engine
    }

    fn queue_of(engine: &TestEngine) -> Vec<String> {
        engine.list().into_iter().map(|t| t.reference).collect()
    }

    fn eos(load_id: u64, reference: &str) -> BackendEvent {
        BackendEvent::EndOfStream { load_id, reference: reference.to_string() }
    }

    fn current_load(engine: &TestEngine) -> u64 {
        engine.load_id().expect("something should be loaded")
    }

    #[test]
    fn test_add_to_empty_queue() {
        let mut engine = create_test_engine();
        engine.add(refs(&["a", "b", "c"]), 0).unwrap();

        let tracks: Vec<Track> = refs(&["a", "b", "c"])
            .into_iter()
            .map(|reference| Track { reference, tags: Tags::default() })
            .collect();
        assert_eq!(engine.list(), tracks);
        assert_eq!(engine.sink(), &vec![Event::Added { tracks, position: 0 }]);
        assert_eq!(engine.current(), None);
        assert_eq!(engine.store().saves(), 1);
    }

    #[test]
    fn test_add_inserts_in_order_at_every_position() {
        for position in 0..=3 {
            let mut engine = engine_with(&["x", "y", "z"]);
            engine.add(refs(&["a", "b"]), position).unwrap();

            let mut expected = refs(&["x", "y", "z"]);
            let tail = expected.split_off(position);
            expected.extend(refs(&["a", "b"]));
            expected.extend(tail);
            assert_eq!(queue_of(&engine), expected);
        }
    }

    #[test]
    fn test_add_validation() {
        let mut engine = engine_with(&["a"]);

        assert_eq!(engine.add(Vec::new(), 0), Err(QueueError::EmptySequence));
        assert_eq!(engine.add(refs(&["b"]), 2), Err(QueueError::InvalidPosition(2)));
        assert_eq!(queue_of(&engine), refs(&["a"]));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn test_add_shifts_cursor_silently() {
        let mut engine = engine_with(&["a", "b"]);
        engine.set_current(Some(1), false).unwrap();
        engine.sink_mut().clear();

        engine.add(refs(&["x", "y"]), 1).unwrap();
        assert_eq!(engine.current(), Some(3));
        assert_eq!(queue_of(&engine)[3], "b");

        engine.add(refs(&["z"]), 4).unwrap();
        assert_eq!(engine.current(), Some(3));
        assert!(engine
            .sink()
            .iter()
            .all(|e| !matches!(e, Event::CurrentChanged { .. })));
    }

    #[test]
    fn test_add_submits_untagged_references_once() {
        let mut engine = create_test_engine();
        engine.add(refs(&["a", "b", "a"]), 0).unwrap();

        // Only the first reference is in flight; the rest wait their turn
        assert_eq!(engine.scanner().prober().started, refs(&["a"]));
        engine.handle_probe_event(ProbeEvent::EndOfStream { reference: "a".to_string() });
        assert_eq!(engine.scanner().prober().started, refs(&["a", "b"]));
        engine.handle_probe_event(ProbeEvent::EndOfStream { reference: "b".to_string() });
        assert!(engine.scanner().is_idle());
    }

    #[test]
    fn test_add_skips_cached_references() {
        let mut engine = create_test_engine();
        engine.add(refs(&["a"]), 0).unwrap();
        let tags = Tags { title: Some("A".to_string()), ..Tags::default() };
        engine.handle_probe_event(ProbeEvent::Tags { reference: "a".to_string(), tags: tags.clone() });
        engine.handle_probe_event(ProbeEvent::StreamStarted { reference: "a".to_string() });
        engine.sink_mut().clear();

        engine.add(refs(&["a"]), 1).unwrap();

        assert_eq!(engine.scanner().prober().started, refs(&["a"]));
        assert!(engine.scanner().is_idle());
        match &engine.sink()[0] {
            Event::Added { tracks, position } => {
                assert_eq!(*position, 1);
                assert_eq!(tracks[0].tags, tags);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_remove_filters_in_one_pass() {
        let mut engine = engine_with(&["a", "b", "c", "d", "e"]);
        engine.remove(vec![3, 0, 3]).unwrap();

        assert_eq!(queue_of(&engine), refs(&["b", "c", "e"]));
        assert_eq!(engine.sink(), &vec![Event::Removed { positions: vec![0, 3] }]);
    }

    #[test]
    fn test_remove_validation() {
        let mut engine = engine_with(&["a", "b"]);

        assert_eq!(engine.remove(Vec::new()), Err(QueueError::EmptySequence));
        assert_eq!(engine.remove(vec![0, 2]), Err(QueueError::InvalidPosition(2)));
        assert_eq!(queue_of(&engine), refs(&["a", "b"]));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn test_remove_before_cursor_shifts_it() {
        let mut engine = engine_with(&["a", "b", "c", "d"]);
        engine.set_current(Some(2), false).unwrap();
        engine.sink_mut().clear();

        engine.remove(vec![0, 3]).unwrap();
        assert_eq!(engine.current(), Some(1));
        assert_eq!(queue_of(&engine)[1], "c");
        assert_eq!(engine.sink().len(), 1);
    }

    #[test]
    fn test_remove_current_while_playing_stops() {
        let mut engine = engine_with(&["a", "b", "c"]);
        engine.set_current(Some(1), true).unwrap();
        engine.sink_mut().clear();
        engine.backend.calls.clear();

        engine.remove(vec![1]).unwrap();

        assert_eq!(engine.current(), None);
        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(
            engine.sink(),
            &vec![
                Event::Removed { positions: vec![1] },
                Event::CurrentChanged { old: Some(1), new: None },
                Event::StateChanged { old: PlaybackState::Playing, new: PlaybackState::Ready },
            ]
        );
        assert_eq!(engine.backend.calls, vec![Call::Idle]);
        assert_eq!(engine.store().snapshot().unwrap().current, None);
    }

    #[test]
    fn test_remove_current_while_ready_only_unsets() {
        let mut engine = engine_with(&["a", "b"]);
        engine.set_current(Some(0), false).unwrap();
        engine.sink_mut().clear();

        engine.remove(vec![0]).unwrap();
        assert_eq!(
            engine.sink(),
            &vec![
                Event::Removed { positions: vec![0] },
                Event::CurrentChanged { old: Some(0), new: None },
            ]
        );
    }

    #[test]
    fn test_clear_stops_and_unsets() {
        let mut engine = engine_with(&["a", "b"]);
        engine.play();
        engine.pause();
        engine.sink_mut().clear();

        engine.clear();

        assert!(engine.is_empty());
        assert_eq!(engine.current(), None);
        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(
            engine.sink(),
            &vec![
                Event::Cleared,
                Event::CurrentChanged { old: Some(0), new: None },
                Event::StateChanged { old: PlaybackState::Paused, new: PlaybackState::Ready },
            ]
        );
        assert_eq!(engine.store().snapshot(), None);
    }

    #[test]
    fn test_reorder_permutes_and_tracks_cursor() {
        let mut engine = engine_with(&["x", "y", "z"]);
        engine.set_current(Some(1), true).unwrap();
        engine.sink_mut().clear();
        engine.backend.calls.clear();

        engine.reorder(vec![2, 0, 1]).unwrap();

        assert_eq!(queue_of(&engine), refs(&["z", "x", "y"]));
        assert_eq!(engine.current(), Some(2));
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.sink(), &vec![Event::Reordered { positions: vec![2, 0, 1] }]);
        assert!(engine.backend.calls.is_empty());
    }

    #[test]
    fn test_reorder_validation() {
        let mut engine = engine_with(&["a", "b", "c"]);

        assert_eq!(engine.reorder(Vec::new()), Err(QueueError::EmptySequence));
        assert_eq!(
            engine.reorder(vec![0, 1]),
            Err(QueueError::InvalidLength { expected: 3, actual: 2 })
        );
        assert_eq!(engine.reorder(vec![0, 1, 3]), Err(QueueError::InvalidPosition(3)));
        assert_eq!(engine.reorder(vec![0, 1, 1]), Err(QueueError::InvalidPosition(1)));
        assert_eq!(queue_of(&engine), refs(&["a", "b", "c"]));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn test_set_current_validation_and_noop() {
        let mut engine = engine_with(&["a", "b"]);

        assert_eq!(engine.set_current(Some(2), false), Err(QueueError::InvalidPosition(2)));
        engine.set_current(None, false).unwrap();
        assert!(engine.sink().is_empty());

        engine.set_current(Some(1), false).unwrap();
        engine.set_current(Some(1), false).unwrap();
        assert_eq!(engine.sink(), &vec![Event::CurrentChanged { old: None, new: Some(1) }]);
    }

    #[test]
    fn test_set_current_while_playing_reloads_without_state_change() {
        let mut engine = engine_with(&["a", "b", "c"]);
        engine.play();
        engine.sink_mut().clear();
        engine.backend.calls.clear();

        engine.set_current(Some(2), false).unwrap();

        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.sink(), &vec![Event::CurrentChanged { old: Some(0), new: Some(2) }]);
        assert_eq!(engine.backend.calls, vec![Call::Load("c".to_string()), Call::Playing]);
    }

    #[test]
    fn test_set_current_while_paused_stops() {
        let mut engine = engine_with(&["a", "b"]);
        engine.play();
        engine.pause();
        engine.sink_mut().clear();

        engine.set_current(Some(1), false).unwrap();

        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(engine.current(), Some(1));
        assert_eq!(
            engine.sink(),
            &vec![
                Event::CurrentChanged { old: Some(0), new: Some(1) },
                Event::StateChanged { old: PlaybackState::Paused, new: PlaybackState::Ready },
            ]
        );
    }

    #[test]
    fn test_set_current_also_play() {
        let mut engine = engine_with(&["a", "b"]);
        engine.set_current(Some(1), true).unwrap();

        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.backend.calls, vec![Call::Load("b".to_string()), Call::Playing]);

        // Same position still honours the play request after a pause
        engine.pause();
        engine.set_current(Some(1), true).unwrap();
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_next_and_previous_bounds() {
        let mut engine = engine_with(&["a", "b"]);

        engine.next();
        engine.previous();
        assert_eq!(engine.current(), None);

        engine.set_current(Some(0), false).unwrap();
        engine.previous();
        assert_eq!(engine.current(), Some(0));
        engine.next();
        assert_eq!(engine.current(), Some(1));
        engine.next();
        assert_eq!(engine.current(), Some(1));
        engine.previous();
        assert_eq!(engine.current(), Some(0));

        // Never autoplays
        assert_eq!(engine.state(), PlaybackState::Ready);
    }

    #[test]
    fn test_play_selects_first_track() {
        let mut engine = engine_with(&["a", "b", "c"]);
        engine.play();

        assert_eq!(engine.current(), Some(0));
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.backend.calls, vec![Call::Load("a".to_string()), Call::Playing]);
        assert_eq!(
            engine.sink(),
            &vec![
                Event::CurrentChanged { old: None, new: Some(0) },
                Event::StateChanged { old: PlaybackState::Ready, new: PlaybackState::Playing },
            ]
        );
    }

    #[test]
    fn test_play_on_empty_queue_is_noop() {
        let mut engine = create_test_engine();
        engine.play();

        assert_eq!(engine.state(), PlaybackState::Ready);
        assert!(engine.sink().is_empty());
        assert!(engine.backend.calls.is_empty());
    }

    #[test]
    fn test_play_resumes_without_reload() {
        let mut engine = engine_with(&["a"]);
        engine.play();
        engine.pause();
        engine.backend.calls.clear();

        engine.play();
        engine.play();

        assert_eq!(engine.backend.calls, vec![Call::Playing]);
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_pause_and_stop_only_from_valid_states() {
        let mut engine = engine_with(&["a"]);

        engine.pause();
        engine.stop();
        assert!(engine.sink().is_empty());
        assert!(engine.backend.calls.is_empty());

        engine.play();
        engine.stop();
        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(engine.current(), Some(0));
        assert_eq!(engine.backend.calls.last(), Some(&Call::Idle));
    }

    #[test]
    fn test_idle_signal_follows_state() {
        #[derive(Default)]
        struct IdleSink(Vec<bool>);

        impl NotificationSink for IdleSink {
            fn notify(&mut self, _event: Event) {}
            fn idle_changed(&mut self, idle: bool) {
                self.0.push(idle);
            }
        }

        let mut engine = QueueEngine::new(
            FakeBackend::default(),
            FakeProber::default(),
            IdleSink::default(),
            MemoryStore::new(),
        );
        assert!(engine.is_idle());

        engine.add(refs(&["a"]), 0).unwrap();
        engine.play();
        assert!(!engine.is_idle());
        engine.pause();
        engine.stop();
        assert!(engine.is_idle());

        assert_eq!(engine.sink().0, vec![false, true]);
    }

    #[test]
    fn test_end_of_stream_advances() {
        let mut engine = engine_with(&["a", "b", "c"]);
        engine.set_current(Some(1), true).unwrap();
        engine.sink_mut().clear();
        engine.backend.calls.clear();

        engine.handle_backend_event(eos(current_load(&engine), "b"));

        assert_eq!(engine.current(), Some(2));
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.sink(), &vec![Event::CurrentChanged { old: Some(1), new: Some(2) }]);
        assert_eq!(engine.backend.calls, vec![Call::Load("c".to_string()), Call::Playing]);
    }

    #[test]
    fn test_end_of_stream_on_last_track_stops_and_keeps_cursor() {
        let mut engine = engine_with(&["a", "b"]);
        engine.set_current(Some(1), true).unwrap();
        engine.sink_mut().clear();

        engine.handle_backend_event(eos(current_load(&engine), "b"));

        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(engine.current(), Some(1));
        assert_eq!(
            engine.sink(),
            &vec![Event::StateChanged { old: PlaybackState::Playing, new: PlaybackState::Ready }]
        );
    }

    #[test]
    fn test_stale_end_of_stream_is_ignored() {
        let mut engine = engine_with(&["a", "b", "c"]);
        engine.play();
        let first_load = current_load(&engine);
        engine.set_current(Some(2), false).unwrap();
        let second_load = current_load(&engine);
        engine.sink_mut().clear();

        // Late notification for the track we switched away from
        engine.handle_backend_event(eos(first_load, "a"));
        assert_eq!(engine.current(), Some(2));
        assert!(engine.sink().is_empty());

        // Nothing is loaded after a stop
        engine.stop();
        engine.sink_mut().clear();
        engine.handle_backend_event(eos(second_load, "c"));
        assert!(engine.sink().is_empty());
        assert_eq!(engine.load_id(), None);
    }

    #[test]
    fn test_stale_end_of_stream_for_duplicate_reference_is_ignored() {
        let mut engine = engine_with(&["a", "b", "a"]);
        engine.play();
        let first_load = current_load(&engine);
        engine.set_current(Some(2), false).unwrap();
        let second_load = current_load(&engine);
        assert_ne!(first_load, second_load);
        engine.sink_mut().clear();

        // Same reference, but from the copy at position 0
        engine.handle_backend_event(eos(first_load, "a"));
        assert_eq!(engine.current(), Some(2));
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(engine.sink().is_empty());

        engine.handle_backend_event(eos(second_load, "a"));
        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(engine.current(), Some(2));
    }

    #[test]
    fn test_backend_error_stops() {
        let mut engine = engine_with(&["a", "b"]);
        engine.play();
        let load_id = current_load(&engine);

        engine.handle_backend_event(BackendEvent::Error {
            load_id,
            reference: "a".to_string(),
            message: "decode failed".to_string(),
        });

        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(engine.current(), Some(0));
    }

    #[test]
    fn test_tag_changed_only_when_different() {
        let mut engine = engine_with(&["a"]);
        let tags = Tags { artist: Some("Artist".to_string()), ..Tags::default() };

        engine.handle_probe_event(ProbeEvent::Tags { reference: "a".to_string(), tags: tags.clone() });
        engine.handle_probe_event(ProbeEvent::StreamStarted { reference: "a".to_string() });
        assert_eq!(
            engine.sink(),
            &vec![Event::TagChanged { reference: "a".to_string(), tags: tags.clone() }]
        );
        assert_eq!(engine.list()[0].tags, tags);

        // Same tags again: no event
        engine.sink_mut().clear();
        engine.add(refs(&["b"]), 1).unwrap();
        engine.sink_mut().clear();
        engine.scanner.add(["a"]);
        engine.handle_probe_event(ProbeEvent::EndOfStream { reference: "b".to_string() });
        engine.handle_probe_event(ProbeEvent::Tags { reference: "a".to_string(), tags });
        engine.handle_probe_event(ProbeEvent::StreamStarted { reference: "a".to_string() });
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn test_restore_from_store() {
        let store = MemoryStore::with_snapshot(Snapshot {
            queue: refs(&["a", "b", "a"]),
            current: Some(1),
        });
        let engine = QueueEngine::new(FakeBackend::default(), FakeProber::default(), Vec::<Event>::new(), store);

        assert_eq!(queue_of(&engine), refs(&["a", "b", "a"]));
        assert_eq!(engine.current(), Some(1));
        assert_eq!(engine.state(), PlaybackState::Ready);
        assert_eq!(engine.scanner().prober().started, refs(&["a"]));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn test_restore_drops_out_of_range_cursor() {
        let store = MemoryStore::with_snapshot(Snapshot { queue: refs(&["a"]), current: Some(5) });
        let engine = QueueEngine::new(FakeBackend::default(), FakeProber::default(), Vec::<Event>::new(), store);

        assert_eq!(engine.current(), None);
    }
}
