//! The input manager
//!
//! Owns every registered stream and turns reader callbacks into table
//! mutations and host events. The flow for one snapshot:
//!
//! ```text
//! Reader::update
//!   └─> EntrySink::send_entry (per row)
//!         ├─ fingerprint index/value halves
//!         ├─ diff against prev  ──unchanged──> move prev -> curr
//!         ├─ marshal index + value
//!         ├─ filter pipeline    ──veto──────> keep old state
//!         ├─ assign destination table, track in curr
//!         └─ fan out New/Changed events
//!   └─> EntrySink::end_current_send
//!         ├─ every entry left in prev is a removal candidate
//!         ├─ filter pipeline    ──veto──────> migrate into curr
//!         ├─ fan out Removed events, delete from table
//!         └─ swap generations: prev <- curr, curr <- empty
//! ```
//!
//! The manager is single-threaded and cooperative: readers and the host
//! dispatch run on the caller's thread, and table locks are never held
//! across either.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::cell::Cell;
use crate::codec::{cell_to_value, row_to_index, row_to_record};
use crate::error::{InputError, Result};
use crate::events::{EventHub, EventKind};
use crate::filter::{filters_allow, Filter};
use crate::fingerprint::Fingerprint;
use crate::reader::{EntrySink, ReaderKind};
use crate::registry::ReaderRegistry;
use crate::schema::{unroll_record_type, FieldSpec};
use crate::stream::{Stream, StreamId, StreamStats, TrackedEntry};
use crate::table::SharedTable;
use crate::value::{FieldType, RecordType, Value};

/// Everything needed to register a stream.
pub struct StreamDescription {
    /// Which reader implementation parses the source
    pub reader: ReaderKind,
    /// Source locator handed to the reader (path, URI, ...)
    pub source: String,
    /// Record type of the table index
    pub idx: Arc<RecordType>,
    /// Record type of the table value
    pub val: Arc<RecordType>,
    /// Table kept in sync with the source
    pub destination: SharedTable,
    /// Wrap a single-leaf value in a one-field record instead of
    /// assigning it bare. Forced on when the value half has more than
    /// one leaf.
    pub want_record: bool,
}

impl StreamDescription {
    pub fn new(
        reader: ReaderKind,
        source: impl Into<String>,
        idx: Arc<RecordType>,
        val: Arc<RecordType>,
        destination: SharedTable,
    ) -> Self {
        Self {
            reader,
            source: source.into(),
            idx,
            val,
            destination,
            want_record: true,
        }
    }

    /// Override the record-wrapping behavior (builder style).
    pub fn with_want_record(mut self, want_record: bool) -> Self {
        self.want_record = want_record;
        self
    }
}

impl fmt::Debug for StreamDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDescription")
            .field("reader", &self.reader)
            .field("source", &self.source)
            .field("idx", &self.idx.name())
            .field("val", &self.val.name())
            .field("want_record", &self.want_record)
            .finish_non_exhaustive()
    }
}

/// Ingests reader snapshots into destination tables and notifies the host.
pub struct InputManager {
    registry: ReaderRegistry,
    hub: Arc<dyn EventHub>,
    streams: HashMap<StreamId, Stream>,
}

impl InputManager {
    pub fn new(registry: ReaderRegistry, hub: Arc<dyn EventHub>) -> Self {
        Self {
            registry,
            hub,
            streams: HashMap::new(),
        }
    }

    /// Register a stream and run its first snapshot.
    ///
    /// On any failure the registration is rolled back completely; the
    /// manager is left as if the call had never been made.
    pub fn create_stream(&mut self, id: StreamId, desc: StreamDescription) -> Result<()> {
        if self.streams.contains_key(&id) {
            return Err(InputError::DuplicateStream(id));
        }
        if desc.source.is_empty() {
            return Err(InputError::description("source must not be empty"));
        }

        // resolve the reader kind first: a memoized one-shot init may run here
        let mut reader = self.registry.instantiate(desc.reader)?;

        let (fields, idx_count, val_count) = match unroll_description(&desc) {
            Ok(parts) => parts,
            Err(e) => {
                reader.finish();
                return Err(e);
            }
        };

        let source = desc.source.clone();
        let stream = Stream {
            id,
            kind: desc.reader,
            reader: Some(reader),
            idx_count,
            val_count,
            idx_type: desc.idx,
            val_type: desc.val,
            dst: desc.destination,
            // more than one value leaf always assembles a record
            want_record: desc.want_record || val_count > 1,
            events: Vec::new(),
            filters: Vec::new(),
            prev: HashMap::new(),
            curr: HashMap::new(),
            stats: StreamStats::default(),
        };
        self.streams.insert(id, stream);
        debug!(stream = %id, idx_count, val_count, "stream registered");

        // bind the reader to its source and schema
        let init_result = {
            let stream = self
                .streams
                .get_mut(&id)
                .ok_or_else(|| InputError::internal("stream vanished during registration"))?;
            let mut reader = stream
                .reader
                .take()
                .ok_or_else(|| InputError::internal("reader slot empty during init"))?;
            let result = reader.init(&source, &fields, idx_count);
            stream.reader = Some(reader);
            result
        };
        if let Err(e) = init_result {
            error!(stream = %id, source = %source, error = %e, "reader init failed");
            self.remove_stream(id);
            return Err(InputError::reader(source, e.to_string()));
        }

        // first snapshot, synchronously
        if let Err(e) = self.force_update(id) {
            self.remove_stream(id);
            return Err(e);
        }

        Ok(())
    }

    /// Tear a stream down: finish its reader and drop all tracked state.
    /// Returns whether the stream existed.
    pub fn remove_stream(&mut self, id: StreamId) -> bool {
        match self.streams.remove(&id) {
            Some(mut stream) => {
                if let Some(reader) = stream.reader.as_mut() {
                    reader.finish();
                }
                debug!(stream = %id, "stream removed");
                true
            }
            None => false,
        }
    }

    /// Synchronously ask the stream's reader for another snapshot.
    pub fn force_update(&mut self, id: StreamId) -> Result<()> {
        let hub = Arc::clone(&self.hub);
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(InputError::UnknownStream(id))?;
        let mut reader = stream
            .reader
            .take()
            .ok_or_else(|| InputError::internal(format!("reentrant update on stream {id}")))?;

        let result = reader.update(&mut SnapshotSession {
            stream: &mut *stream,
            hub: hub.as_ref(),
        });
        let source = reader.source().to_string();
        stream.reader = Some(reader);

        result.map_err(|e| {
            error!(stream = %id, source = %source, error = %e, "reader update failed");
            InputError::reader(source, e.to_string())
        })
    }

    /// Subscribe an event handler name to a stream.
    pub fn register_event(&mut self, id: StreamId, name: impl Into<String>) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(InputError::UnknownStream(id))?;
        stream.events.push(name.into());
        Ok(())
    }

    /// Drop the first subscription with the given name. Returns whether
    /// one was found.
    pub fn unregister_event(&mut self, id: StreamId, name: &str) -> Result<bool> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(InputError::UnknownStream(id))?;
        match stream.events.iter().position(|n| n == name) {
            Some(pos) => {
                stream.events.remove(pos);
                Ok(true)
            }
            None => {
                warn!(stream = %id, event = %name, "unregistering unknown event");
                Ok(false)
            }
        }
    }

    /// Attach a filter. Names should be unique; duplicates are tolerated.
    pub fn add_filter(&mut self, id: StreamId, filter: Filter) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(InputError::UnknownStream(id))?;
        stream.filters.push(filter);
        Ok(())
    }

    /// Drop the first filter with the given name. Returns whether one was
    /// found.
    pub fn remove_filter(&mut self, id: StreamId, name: &str) -> Result<bool> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(InputError::UnknownStream(id))?;
        match stream.filters.iter().position(|f| f.name == name) {
            Some(pos) => {
                stream.filters.remove(pos);
                Ok(true)
            }
            None => {
                warn!(stream = %id, filter = %name, "removing unknown filter");
                Ok(false)
            }
        }
    }

    /// Write a row straight into the destination table, bypassing diff
    /// tracking: the next snapshot neither sees nor preserves it.
    pub fn put(&self, id: StreamId, row: &[Cell]) -> Result<()> {
        let stream = self.streams.get(&id).ok_or(InputError::UnknownStream(id))?;
        if row.len() != stream.total_fields() {
            return Err(InputError::RowLength {
                got: row.len(),
                expected: stream.total_fields(),
            });
        }

        let index = row_to_index(&row[..stream.idx_count], stream.idx_count, &stream.idx_type)?;
        let value = build_value(row, stream)?;

        let mut tab = stream.dst.write();
        let key = tab.key_of(&index)?;
        tab.assign(key, index, value);
        Ok(())
    }

    /// Delete the row the index half of `row` addresses. Returns whether
    /// a row was removed.
    pub fn delete(&self, id: StreamId, row: &[Cell]) -> Result<bool> {
        let stream = self.streams.get(&id).ok_or(InputError::UnknownStream(id))?;
        if row.len() < stream.idx_count {
            return Err(InputError::RowLength {
                got: row.len(),
                expected: stream.idx_count,
            });
        }

        let index = row_to_index(&row[..stream.idx_count], stream.idx_count, &stream.idx_type)?;
        Ok(stream.dst.write().remove(&index))
    }

    /// Empty the stream's destination table.
    pub fn clear(&self, id: StreamId) -> Result<()> {
        let stream = self.streams.get(&id).ok_or(InputError::UnknownStream(id))?;
        stream.dst.write().clear();
        Ok(())
    }

    /// Counters for a stream, if it exists.
    pub fn stats(&self, id: StreamId) -> Option<StreamStats> {
        self.streams.get(&id).map(|s| s.stats)
    }

    /// Which reader implementation a stream was created with.
    pub fn reader_kind(&self, id: StreamId) -> Option<ReaderKind> {
        self.streams.get(&id).map(|s| s.kind)
    }

    pub fn has_stream(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id)
    }

    /// Registered stream ids, ascending.
    pub fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<_> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Drop for InputManager {
    fn drop(&mut self) {
        for stream in self.streams.values_mut() {
            if let Some(reader) = stream.reader.as_mut() {
                reader.finish();
            }
        }
    }
}

/// Flatten a description's record types into the positional schema.
fn unroll_description(desc: &StreamDescription) -> Result<(Vec<FieldSpec>, usize, usize)> {
    let mut fields = Vec::new();
    unroll_record_type(&mut fields, &desc.idx, "")?;
    let idx_count = fields.len();
    unroll_record_type(&mut fields, &desc.val, "")?;
    let val_count = fields.len() - idx_count;

    if idx_count == 0 {
        return Err(InputError::description(format!(
            "index record `{}` has no fields",
            desc.idx.name()
        )));
    }
    if val_count == 0 {
        return Err(InputError::description(format!(
            "value record `{}` has no fields",
            desc.val.name()
        )));
    }

    Ok((fields, idx_count, val_count))
}

/// Marshal the value half of a row per the stream's `want_record` setting.
fn build_value(row: &[Cell], stream: &Stream) -> Result<Value> {
    if stream.val_count == 1 && !stream.want_record {
        let field = stream
            .val_type
            .fields()
            .first()
            .ok_or_else(|| InputError::internal("value record has no fields"))?;
        let expected = match &field.ty {
            FieldType::Record(_) => None,
            other => Some(other.kind()),
        };
        return cell_to_value(&row[stream.idx_count], expected);
    }

    let mut pos = stream.idx_count;
    let value = row_to_record(row, &stream.val_type, &mut pos)?;
    let consumed = pos - stream.idx_count;
    if consumed != stream.val_count {
        return Err(InputError::CursorMismatch {
            consumed,
            expected: stream.val_count,
        });
    }
    Ok(value)
}

fn fan_out(hub: &dyn EventHub, events: &[String], kind: EventKind, index: &Value, payload: &Value) {
    for name in events {
        if !hub.has_handler(name) {
            warn!(event = %name, "event handler not found");
            continue;
        }
        hub.dispatch(name, kind, index.clone(), payload.clone());
    }
}

/// The diff engine a reader feeds during one `update` call.
struct SnapshotSession<'a> {
    stream: &'a mut Stream,
    hub: &'a dyn EventHub,
}

impl EntrySink for SnapshotSession<'_> {
    fn send_entry(&mut self, row: Vec<Cell>) -> Result<()> {
        let stream = &mut *self.stream;
        stream.stats.rows += 1;

        if row.len() != stream.total_fields() {
            let err = InputError::RowLength {
                got: row.len(),
                expected: stream.total_fields(),
            };
            error!(stream = %stream.id, error = %err, "reader delivered malformed row");
            return Err(err);
        }

        let idx_fp = Fingerprint::of(&row[..stream.idx_count]);
        let val_fp = Fingerprint::of(&row[stream.idx_count..]);

        // diff against the previous snapshot
        let mut displaced: Option<TrackedEntry> = None;
        if let Some(entry) = stream.prev.remove(&idx_fp) {
            if entry.val_fp == val_fp {
                // unchanged: carry the entry over untouched
                stream.stats.unchanged += 1;
                stream.curr.insert(idx_fp, entry);
                return Ok(());
            }
            displaced = Some(entry);
        }
        let changed = displaced.is_some();

        let index = row_to_index(&row[..stream.idx_count], stream.idx_count, &stream.idx_type)
            .map_err(|e| {
                error!(stream = %stream.id, error = %e, "index conversion failed");
                e
            })?;
        let value = build_value(&row, stream).map_err(|e| {
            error!(stream = %stream.id, error = %e, "value conversion failed");
            e
        })?;

        // the changed-event payload is the value being replaced
        let old_value = if changed {
            match stream.dst.read().get(&index) {
                Some(old) => Some(old),
                None => {
                    let err = InputError::internal(format!(
                        "changed row has no table entry on stream {}",
                        stream.id
                    ));
                    error!(stream = %stream.id, error = %err, "destination table out of sync");
                    return Err(err);
                }
            }
        } else {
            None
        };

        let kind = if changed {
            EventKind::Changed
        } else {
            EventKind::New
        };
        if !filters_allow(&stream.filters, kind, &index, &value) {
            stream.stats.vetoed += 1;
            if let Some(entry) = displaced {
                // keep the old state for the rest of the snapshot
                stream.curr.insert(idx_fp, entry);
            } else {
                // drop whatever a duplicate row may have left pending
                stream.curr.remove(&idx_fp);
            }
            return Ok(());
        }

        let idx_key = stream.dst.read().key_of(&index)?;
        stream
            .dst
            .write()
            .assign(idx_key.clone(), index.clone(), value.clone());
        stream.curr.insert(idx_fp, TrackedEntry { idx_key, val_fp });

        if changed {
            stream.stats.changed += 1;
        } else {
            stream.stats.new += 1;
        }

        let payload = old_value.as_ref().unwrap_or(&value);
        fan_out(self.hub, &stream.events, kind, &index, payload);

        Ok(())
    }

    fn end_current_send(&mut self) -> Result<()> {
        let stream = &mut *self.stream;
        let need_values = !stream.events.is_empty() || !stream.filters.is_empty();

        // two-pass walk: drain up front so vetoed removals can migrate
        // into curr while the candidates are processed
        let leftovers: Vec<(Fingerprint, TrackedEntry)> = stream.prev.drain().collect();
        for (fp, entry) in leftovers {
            if need_values {
                let (index, value) = {
                    let tab = stream.dst.read();
                    (
                        tab.recover_index(&entry.idx_key),
                        tab.get_by_key(&entry.idx_key),
                    )
                };
                let (Some(index), Some(value)) = (index, value) else {
                    // host deleted the row behind our back; nothing left
                    // to ask filters about or announce
                    error!(stream = %stream.id, "removal candidate vanished from destination table");
                    stream.dst.write().remove_by_key(&entry.idx_key);
                    continue;
                };

                if !filters_allow(&stream.filters, EventKind::Removed, &index, &value) {
                    stream.stats.vetoed += 1;
                    stream.curr.insert(fp, entry);
                    continue;
                }

                fan_out(
                    self.hub,
                    &stream.events,
                    EventKind::Removed,
                    &index,
                    &value,
                );
            }

            stream.dst.write().remove_by_key(&entry.idx_key);
            stream.stats.removed += 1;
        }

        // generation swap
        stream.prev = std::mem::take(&mut stream.curr);
        debug!(
            stream = %stream.id,
            entries = stream.prev.len(),
            "snapshot closed"
        );
        Ok(())
    }
}
