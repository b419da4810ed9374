//! Reader interface
//!
//! A reader parses one external source (a delimited text file, say) and
//! delivers flat rows of [`Cell`]s against the schema it was initialized
//! with. Delivery is a synchronous callback protocol: during `update` the
//! reader pushes zero or more rows into the [`EntrySink`] it is lent and
//! then closes the snapshot with `end_current_send`. Concrete reader
//! implementations live outside this crate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::Result;
use crate::schema::FieldSpec;

/// Reader implementations known to the host, selected by streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderKind {
    /// Delimited text files
    Ascii,
    /// Whole-file and line-oriented blobs
    Raw,
    /// Synthetic load generation
    Benchmark,
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderKind::Ascii => write!(f, "ascii"),
            ReaderKind::Raw => write!(f, "raw"),
            ReaderKind::Benchmark => write!(f, "benchmark"),
        }
    }
}

/// Where a reader delivers rows during an update.
///
/// The sink is the live diff engine for the reader's stream; both calls
/// run on the caller's thread and may fan out to host filters and events
/// before returning.
pub trait EntrySink {
    /// Deliver one row. The row's length must equal the stream's total
    /// leaf count (index plus value halves).
    fn send_entry(&mut self, row: Vec<Cell>) -> Result<()>;

    /// Close the current snapshot: compute removals and swap generations.
    fn end_current_send(&mut self) -> Result<()>;
}

/// A source parser feeding one stream.
pub trait Reader: Send {
    /// Bind the reader to its source and flattened schema. The first
    /// `idx_fields` entries of `fields` are the index half.
    fn init(&mut self, source: &str, fields: &[FieldSpec], idx_fields: usize) -> Result<()>;

    /// Produce one snapshot: send each current row into `sink`, then call
    /// `end_current_send` exactly once.
    fn update(&mut self, sink: &mut dyn EntrySink) -> Result<()>;

    /// Release resources. Must be idempotent.
    fn finish(&mut self);

    /// The source string, for error reporting.
    fn source(&self) -> &str;
}
