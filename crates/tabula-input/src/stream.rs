//! Per-stream registration state

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::fingerprint::Fingerprint;
use crate::reader::{Reader, ReaderKind};
use crate::table::{SharedTable, TableKey};
use crate::value::RecordType;

/// Script-facing identifier of a registered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub u32);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Counters describing what a stream has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Rows delivered by the reader
    pub rows: u64,
    /// Rows identical to the previous snapshot
    pub unchanged: u64,
    /// Entries added
    pub new: u64,
    /// Entries whose value changed
    pub changed: u64,
    /// Entries removed at snapshot end
    pub removed: u64,
    /// Changes vetoed by a filter
    pub vetoed: u64,
}

/// What the diff engine remembers about one table entry.
///
/// The `idx_key` is the destination table's own key; its presence here
/// implies the entry is still present in the table.
#[derive(Debug, Clone)]
pub(crate) struct TrackedEntry {
    pub idx_key: TableKey,
    pub val_fp: Fingerprint,
}

/// Everything the manager holds for one registered stream.
pub(crate) struct Stream {
    pub id: StreamId,
    pub kind: ReaderKind,
    /// Taken out of the slot while an update is in flight
    pub reader: Option<Box<dyn Reader>>,
    pub idx_count: usize,
    pub val_count: usize,
    pub idx_type: Arc<RecordType>,
    pub val_type: Arc<RecordType>,
    pub dst: SharedTable,
    pub want_record: bool,
    pub events: Vec<String>,
    pub filters: Vec<Filter>,
    /// Previous snapshot: fingerprint of the index half -> tracked entry
    pub prev: HashMap<Fingerprint, TrackedEntry>,
    /// Snapshot being assembled
    pub curr: HashMap<Fingerprint, TrackedEntry>,
    pub stats: StreamStats,
}

impl Stream {
    pub fn total_fields(&self) -> usize {
        self.idx_count + self.val_count
    }
}
