//! Change events and the host dispatch seam
//!
//! Every table mutation the diff engine performs can fan out to named
//! event handlers owned by the host runtime. Dispatch is fire-and-forget:
//! the manager hands owned values to the hub and never observes handler
//! effects within the same snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// What happened to a table entry between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Entry appeared; payload is the new value
    New,
    /// Entry's value changed; payload is the previous value
    Changed,
    /// Entry disappeared; payload is the last value
    Removed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::New => write!(f, "new"),
            EventKind::Changed => write!(f, "changed"),
            EventKind::Removed => write!(f, "removed"),
        }
    }
}

/// The host runtime's event registry and dispatcher.
///
/// The manager looks a handler up before dispatching; an unknown name is
/// reported and skipped without disturbing the snapshot. Dispatched values
/// are owned by the recipient.
pub trait EventHub: Send + Sync {
    /// Whether a handler is registered under `name`.
    fn has_handler(&self, name: &str) -> bool;

    /// Enqueue `(kind, index, payload)` for the handler named `name`.
    fn dispatch(&self, name: &str, kind: EventKind, index: Value, payload: Value);
}
