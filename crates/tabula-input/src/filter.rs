//! Predicate filters
//!
//! A filter can veto a single add/change/remove before it reaches the
//! destination table. Predicates see the event kind plus borrowed index
//! and value; returning `false` vetoes. Filters run in registration
//! order, and a filter registered without a predicate is skipped.

use std::fmt;
use std::sync::Arc;

use crate::events::EventKind;
use crate::value::Value;

/// Verdict-producing host function: `false` vetoes the change.
pub type Predicate = Arc<dyn Fn(EventKind, &Value, &Value) -> bool + Send + Sync>;

/// A named, optionally predicated filter attached to a stream.
#[derive(Clone)]
pub struct Filter {
    pub name: String,
    pub pred: Option<Predicate>,
}

impl Filter {
    /// Create a filter with a predicate.
    pub fn new(
        name: impl Into<String>,
        pred: impl Fn(EventKind, &Value, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pred: Some(Arc::new(pred)),
        }
    }

    /// Create a predicate-less marker filter; it never vetoes.
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pred: None,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("pred", &self.pred.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Evaluate `filters` in order; `false` means some filter vetoed.
pub(crate) fn filters_allow(
    filters: &[Filter],
    kind: EventKind,
    index: &Value,
    value: &Value,
) -> bool {
    for filter in filters {
        let Some(pred) = &filter.pred else {
            continue;
        };
        if !pred(kind, index, value) {
            return false;
        }
    }
    true
}
