//! tabula-input - snapshot-diffing input framework
//!
//! Ingests externally produced tabular data into typed, indexed in-memory
//! tables owned by a host runtime, and tells the host what changed between
//! successive snapshots of each source.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       InputManager                         │
//! │  create/remove stream, force update, put/delete/clear,     │
//! │  event + filter registration                               │
//! ├────────────────────────────────────────────────────────────┤
//! │  Reader ──rows──> diff engine ──deltas──> filter pipeline  │
//! │   (plugin)        prev/curr maps          │                │
//! │                   fingerprints            ├──> dest table  │
//! │                                           └──> event hub   │
//! ├────────────────────────────────────────────────────────────┤
//! │  Host seams: Table (value store), EventHub (dispatch)      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers parse one source each and deliver flat rows of tagged [`Cell`]s.
//! The manager fingerprints each row, diffs it against the previous
//! snapshot, marshals it into host [`Value`]s per the stream's record
//! schema, runs user predicates that may veto the change, mutates the
//! destination table, and fans out `New`/`Changed`/`Removed` events.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabula_input::{
//!     FieldType, Filter, InputManager, Kind, MemoryTable, ReaderDef,
//!     ReaderKind, ReaderRegistry, RecordType, StreamDescription, StreamId,
//! };
//!
//! let mut registry = ReaderRegistry::new();
//! registry.register(ReaderDef::new(ReaderKind::Ascii, "ascii", || {
//!     Box::new(MyAsciiReader::new())
//! }));
//!
//! let mut manager = InputManager::new(registry, host_event_hub);
//!
//! let idx = Arc::new(RecordType::new("Idx").field("host", FieldType::Atom(Kind::Addr)));
//! let val = Arc::new(RecordType::new("Val").field("count", FieldType::Atom(Kind::Count)));
//! let table = MemoryTable::shared();
//!
//! manager.create_stream(
//!     StreamId(1),
//!     StreamDescription::new(ReaderKind::Ascii, "/var/data/hosts.tsv", idx, val, table),
//! )?;
//! manager.register_event(StreamId(1), "host_seen")?;
//! manager.add_filter(StreamId(1), Filter::new("no-loopback", |_, idx, _| {
//!     // return false to veto
//!     true
//! }))?;
//!
//! // later, on the host's schedule:
//! manager.force_update(StreamId(1))?;
//! ```
//!
//! The manager is single-threaded and cooperative: it runs on the host's
//! main thread, readers deliver rows by synchronous callbacks, and event
//! dispatch is fire-and-forget into the host's queue.

mod cell;
mod codec;
mod error;
mod events;
mod filter;
mod fingerprint;
mod manager;
mod reader;
mod registry;
mod schema;
mod stream;
mod table;
mod value;

pub mod testing;

pub use cell::Cell;
pub use codec::{cell_to_value, row_to_index, row_to_record};
pub use error::{InputError, Result};
pub use events::{EventHub, EventKind};
pub use filter::{Filter, Predicate};
pub use fingerprint::Fingerprint;
pub use manager::{InputManager, StreamDescription};
pub use reader::{EntrySink, Reader, ReaderKind};
pub use registry::{ReaderDef, ReaderFactory, ReaderInit, ReaderRegistry};
pub use schema::{is_compatible, unroll_record_type, FieldSpec};
pub use stream::{StreamId, StreamStats};
pub use table::{MemoryTable, SharedTable, Table, TableKey};
pub use value::{Field, FieldType, Kind, RecordType, Subnet, Value};
