//! Tag prober backed by `lofty`.
//!
//! Resolves a reference to a local file, reads its primary (or first) tag
//! and posts the outcome back to the event loop as [`ProbeEvent`]s: a
//! `Tags` batch when anything was found, then `StreamStarted` to close the
//! probe, or a single `Error`.
//!
//! Reads happen on a dedicated worker thread. A slow disk, a network mount
//! or a FIFO in the queue stalls that worker, never the event loop.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{anyhow, Context, Result};
use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use log::{debug, error};
use url::Url;

use crate::scanner::{ProbeEvent, Prober};
use crate::types::Tags;

/// Resolve a track reference to a filesystem path.
///
/// `file://` URIs are decoded; anything without a scheme is taken as a
/// plain path. Other schemes are rejected.
pub fn reference_to_path(reference: &str) -> Result<PathBuf> {
    match Url::parse(reference) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|()| anyhow!("Not a local file URI: {reference}")),
        Ok(url) if url.scheme().len() > 1 => {
            Err(anyhow!("Unsupported scheme '{}' in {reference}", url.scheme()))
        }
        // No scheme, or a Windows drive letter parsed as one
        _ => Ok(PathBuf::from(reference)),
    }
}

/// Read title/artist/album from the file behind `reference`.
///
/// Values are trimmed; blank values count as missing.
pub fn read_tags(reference: &str) -> Result<Tags> {
    let path = reference_to_path(reference)?;
    let tagged_file = lofty::read_from_path(&path)
        .with_context(|| format!("Failed to read tags from {}", path.display()))?;

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(Tags::default());
    };

    Ok(Tags {
        title: clean(tag.title()),
        artist: clean(tag.artist()),
        album: clean(tag.album()),
    })
}

fn clean(value: Option<Cow<'_, str>>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read `reference` and post the outcome.
fn probe<F: FnMut(ProbeEvent)>(reference: String, post: &mut F) {
    match read_tags(&reference) {
        Ok(tags) => {
            if !tags.is_empty() {
                post(ProbeEvent::Tags { reference: reference.clone(), tags });
            }
            post(ProbeEvent::StreamStarted { reference });
        }
        Err(e) => {
            debug!("Tag probe failed: {e:#}");
            post(ProbeEvent::Error { reference, message: format!("{e:#}") });
        }
    }
}

/// [`Prober`] reading local files with `lofty` on a worker thread.
///
/// [`start`](Prober::start) only hands the reference to the worker and
/// returns. The worker reads the file and delivers the outcome through
/// `post`, which is expected to forward it to the event loop. The worker
/// exits once the prober is dropped and its current read has finished.
pub struct LoftyProber {
    requests: Sender<String>,
}

impl LoftyProber {
    /// Spawn the probing worker.
    pub fn new<F>(mut post: F) -> Result<Self>
    where
        F: FnMut(ProbeEvent) + Send + 'static,
    {
        let (requests, rx) = mpsc::channel::<String>();
        thread::Builder::new()
            .name("tag-prober".to_string())
            .spawn(move || {
                for reference in rx {
                    probe(reference, &mut post);
                }
                debug!("Tag prober stopped");
            })
            .context("Failed to spawn tag prober")?;
        Ok(Self { requests })
    }
}

impl Prober for LoftyProber {
    fn start(&mut self, reference: &str) {
        if self.requests.send(reference.to_string()).is_err() {
            error!("Tag prober is gone, {reference} will not be scanned");
        }
    }
}
