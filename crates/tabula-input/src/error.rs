//! Error types for the input framework
//!
//! Splits user-correctable problems (bad stream descriptions, unknown reader
//! kinds, incompatible field types) from contract breaks by a reader or the
//! host (cursor mismatches, cell-tag mismatches, vanished table entries).
//! Contract breaks are logged with stream context at the call site before
//! being returned.

use thiserror::Error;

use crate::reader::ReaderKind;
use crate::stream::StreamId;
use crate::value::Kind;

/// Result type alias for input-framework operations.
pub type Result<T> = std::result::Result<T, InputError>;

/// Errors raised by the input manager and its collaborators.
#[derive(Error, Debug)]
pub enum InputError {
    /// Stream description rejected before any state was touched
    #[error("invalid stream description: {0}")]
    Description(String),

    /// Reader kind has no registry entry
    #[error("unknown reader kind `{0}`")]
    UnknownReader(ReaderKind),

    /// Reader one-shot initialization failed; the kind is now disabled
    #[error("reader `{name}` failed to initialize")]
    ReaderInitFailed { name: &'static str },

    /// Reader kind was disabled by an earlier failed initialization
    #[error("reader `{name}` is disabled after a failed initialization")]
    ReaderDisabled { name: &'static str },

    /// Field type not accepted for tabular input
    #[error("incompatible type for field `{field}`: {detail}")]
    IncompatibleField { field: String, detail: String },

    /// Operation addressed a stream id that is not registered
    #[error("unknown input stream {0}")]
    UnknownStream(StreamId),

    /// `create_stream` was called with an id that is already registered
    #[error("input stream {0} already exists")]
    DuplicateStream(StreamId),

    /// Reader init or update reported a failure
    #[error("reader for `{source_name}` failed: {reason}")]
    Reader { source_name: String, reason: String },

    /// A cell's tag contradicted the schema
    #[error("cell type mismatch: expected {expected}, got {found}")]
    CellMismatch { expected: Kind, found: Kind },

    /// A container cell held an element of the wrong kind
    #[error("container element mismatch: declared {declared}, got {found}")]
    ContainerElement { declared: Kind, found: Kind },

    /// A row held the wrong number of cells for its stream
    #[error("row length mismatch: got {got} cells, stream carries {expected}")]
    RowLength { got: usize, expected: usize },

    /// A record walk consumed a different number of cells than the schema
    #[error("row cursor mismatch: consumed {consumed} cells, expected {expected}")]
    CursorMismatch { consumed: usize, expected: usize },

    /// Contract break by a reader or the host
    #[error("internal error: {0}")]
    Internal(String),
}

impl InputError {
    /// Create a description error.
    pub fn description(msg: impl Into<String>) -> Self {
        Self::Description(msg.into())
    }

    /// Create a reader failure error.
    pub fn reader(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reader {
            source_name: source.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal (contract-break) error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error indicates a contract break rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::CellMismatch { .. }
                | Self::ContainerElement { .. }
                | Self::RowLength { .. }
                | Self::CursorMismatch { .. }
                | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InputError::reader("/var/data/hosts.tsv", "poll failed");
        assert_eq!(
            err.to_string(),
            "reader for `/var/data/hosts.tsv` failed: poll failed"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(InputError::internal("boom").is_internal());
        assert!(InputError::CursorMismatch {
            consumed: 2,
            expected: 3
        }
        .is_internal());
        assert!(!InputError::description("bad").is_internal());
    }
}
