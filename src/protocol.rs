//! # JSON-Lines Protocol
//!
//! Maps one request line onto one engine call and renders the outcome.
//!
//! ## Requests
//!
//! ```text
//! {"id": 1, "op": "add", "refs": ["file:///a.flac"], "position": 0}
//! {"id": 2, "op": "set_current", "position": 0, "also_play": true}
//! {"id": 3, "op": "list"}
//! ```
//!
//! `id` is optional and echoed back. `set_current` takes `"position": null`
//! to unset the cursor.
//!
//! ## Output
//!
//! Every output line carries a `type`:
//!
//! ```text
//! {"type":"event","event":"added","tracks":[...],"position":0}
//! {"type":"response","id":1,"ok":true,"result":null}
//! {"type":"response","id":9,"ok":false,"error":"Invalid position: 7"}
//! {"type":"idle","idle":false}
//! ```
//!
//! Events belonging to a request are written before its response.

use serde::{Deserialize, Serialize};

use crate::backend::MediaBackend;
use crate::engine::QueueEngine;
use crate::error::QueueError;
use crate::events::{Event, NotificationSink};
use crate::scanner::Prober;
use crate::store::PersistenceStore;
use crate::types::{PlaybackState, Track};

/// Engine operations exposed over the wire
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    List,
    Add { refs: Vec<String>, position: usize },
    Remove { positions: Vec<usize> },
    Clear,
    Reorder { positions: Vec<usize> },
    GetCurrent,
    SetCurrent {
        position: Option<usize>,
        #[serde(default)]
        also_play: bool,
    },
    Next,
    Previous,
    Play,
    Pause,
    Stop,
    GetState,
}

/// A request line: optional correlation id plus the operation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub request: Request,
}

impl Envelope {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Successful result of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Done,
    Tracks(Vec<Track>),
    Current(Option<usize>),
    State(PlaybackState),
}

/// One output line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    Response {
        id: Option<u64>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Reply>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        #[serde(flatten)]
        event: Event,
    },
    Idle {
        idle: bool,
    },
}

impl Output {
    pub fn success(id: Option<u64>, reply: Reply) -> Self {
        Output::Response { id, ok: true, result: Some(reply), error: None }
    }

    pub fn failure(id: Option<u64>, error: impl ToString) -> Self {
        Output::Response { id, ok: false, result: None, error: Some(error.to_string()) }
    }
}

/// Run `request` against `engine`.
pub fn dispatch<B, P, N, S>(
    engine: &mut QueueEngine<B, P, N, S>,
    request: Request,
) -> Result<Reply, QueueError>
where
    B: MediaBackend,
    P: Prober,
    N: NotificationSink,
    S: PersistenceStore,
{
    match request {
        Request::List => return Ok(Reply::Tracks(engine.list())),
        Request::GetCurrent => return Ok(Reply::Current(engine.current())),
        Request::GetState => return Ok(Reply::State(engine.state())),
        Request::Add { refs, position } => engine.add(refs, position)?,
        Request::Remove { positions } => engine.remove(positions)?,
        Request::Clear => engine.clear(),
        Request::Reorder { positions } => engine.reorder(positions)?,
        Request::SetCurrent { position, also_play } => engine.set_current(position, also_play)?,
        Request::Next => engine.next(),
        Request::Previous => engine.previous(),
        Request::Play => engine.play(),
        Request::Pause => engine.pause(),
        Request::Stop => engine.stop(),
    }
    Ok(Reply::Done)
}
