//! Test doubles
//!
//! Stand-ins for the collaborators the manager consumes: a scripted
//! reader that replays queued snapshots, and event hubs that record or
//! swallow dispatches. Used by this crate's own tests and handy for
//! hosts testing their integration.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cell::Cell;
use crate::error::{InputError, Result};
use crate::events::{EventHub, EventKind};
use crate::reader::{EntrySink, Reader};
use crate::schema::FieldSpec;
use crate::value::Value;

/// Shared queue of snapshots a [`ScriptedReader`] replays.
///
/// Clone the feed, hand one clone to the reader factory, and keep the
/// other to queue snapshots from the test body.
#[derive(Clone, Default)]
pub struct SnapshotFeed {
    inner: Arc<Mutex<FeedState>>,
}

#[derive(Default)]
struct FeedState {
    snapshots: VecDeque<Vec<Vec<Cell>>>,
    fail_updates: usize,
}

impl SnapshotFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one snapshot's rows. An update with nothing queued delivers
    /// an empty snapshot.
    pub fn push(&self, rows: Vec<Vec<Cell>>) {
        self.inner.lock().snapshots.push_back(rows);
    }

    /// Make the next update fail before delivering anything.
    pub fn fail_next_update(&self) {
        self.inner.lock().fail_updates += 1;
    }
}

/// A [`Reader`] that replays snapshots from a [`SnapshotFeed`].
#[derive(Default)]
pub struct ScriptedReader {
    source: String,
    feed: SnapshotFeed,
    finished: bool,
}

impl ScriptedReader {
    pub fn with_feed(feed: SnapshotFeed) -> Self {
        Self {
            source: String::new(),
            feed,
            finished: false,
        }
    }
}

impl Reader for ScriptedReader {
    fn init(&mut self, source: &str, _fields: &[FieldSpec], _idx_fields: usize) -> Result<()> {
        self.source = source.to_string();
        Ok(())
    }

    fn update(&mut self, sink: &mut dyn EntrySink) -> Result<()> {
        let rows = {
            let mut state = self.feed.inner.lock();
            if state.fail_updates > 0 {
                state.fail_updates -= 1;
                return Err(InputError::reader(self.source.clone(), "scripted failure"));
            }
            state.snapshots.pop_front().unwrap_or_default()
        };

        for row in rows {
            sink.send_entry(row)?;
        }
        sink.end_current_send()
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// One dispatched event as seen by a [`RecordingHub`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub name: String,
    pub kind: EventKind,
    pub index: Value,
    pub payload: Value,
}

/// An [`EventHub`] that records every dispatch for later inspection.
#[derive(Clone, Default)]
pub struct RecordingHub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Default)]
struct HubState {
    handlers: HashSet<String>,
    dispatched: Vec<DispatchedEvent>,
}

impl RecordingHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler name (builder style).
    pub fn with_handler(self, name: impl Into<String>) -> Self {
        self.inner.lock().handlers.insert(name.into());
        self
    }

    /// Register a handler name.
    pub fn add_handler(&self, name: impl Into<String>) {
        self.inner.lock().handlers.insert(name.into());
    }

    /// Everything dispatched so far, in order.
    pub fn events(&self) -> Vec<DispatchedEvent> {
        self.inner.lock().dispatched.clone()
    }

    /// Drain and return everything dispatched so far.
    pub fn take(&self) -> Vec<DispatchedEvent> {
        std::mem::take(&mut self.inner.lock().dispatched)
    }
}

impl EventHub for RecordingHub {
    fn has_handler(&self, name: &str) -> bool {
        self.inner.lock().handlers.contains(name)
    }

    fn dispatch(&self, name: &str, kind: EventKind, index: Value, payload: Value) {
        self.inner.lock().dispatched.push(DispatchedEvent {
            name: name.to_string(),
            kind,
            index,
            payload,
        });
    }
}

/// An [`EventHub`] with no handlers at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHub;

impl EventHub for NullHub {
    fn has_handler(&self, _name: &str) -> bool {
        false
    }

    fn dispatch(&self, _name: &str, _kind: EventKind, _index: Value, _payload: Value) {}
}
