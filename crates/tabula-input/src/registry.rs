//! Reader registry with factory pattern
//!
//! Maps a [`ReaderKind`] to a factory plus an optional one-shot
//! initializer. Init outcomes are memoized: a successful init never runs
//! again, a failed init permanently disables the kind by dropping its
//! factory.

use tracing::{debug, error};

use crate::error::{InputError, Result};
use crate::reader::{Reader, ReaderKind};

/// Factory function producing reader instances.
pub type ReaderFactory = Box<dyn Fn() -> Box<dyn Reader> + Send + Sync>;

/// One-shot initializer run before the first instantiation of a kind.
pub type ReaderInit = Box<dyn Fn() -> bool + Send + Sync>;

/// One registered reader implementation.
pub struct ReaderDef {
    kind: ReaderKind,
    name: &'static str,
    init: Option<ReaderInit>,
    factory: Option<ReaderFactory>,
}

impl ReaderDef {
    /// Register `factory` for `kind`; `name` is used in diagnostics.
    pub fn new(
        kind: ReaderKind,
        name: &'static str,
        factory: impl Fn() -> Box<dyn Reader> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            name,
            init: None,
            factory: Some(Box::new(factory)),
        }
    }

    /// Attach a one-shot initializer (builder style).
    pub fn with_init(mut self, init: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.init = Some(Box::new(init));
        self
    }
}

/// Catalog of available reader implementations.
#[derive(Default)]
pub struct ReaderRegistry {
    defs: Vec<ReaderDef>,
}

impl ReaderRegistry {
    /// Create an empty registry; the host registers its readers at startup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader definition. A later registration for the same
    /// kind shadows the earlier one.
    pub fn register(&mut self, def: ReaderDef) {
        debug!(kind = %def.kind, name = def.name, "registering reader");
        self.defs.insert(0, def);
    }

    /// Whether `kind` has a registration (possibly disabled).
    pub fn contains(&self, kind: ReaderKind) -> bool {
        self.defs.iter().any(|d| d.kind == kind)
    }

    /// Instantiate a reader for `kind`, running its one-shot init first
    /// if it has not run yet.
    pub(crate) fn instantiate(&mut self, kind: ReaderKind) -> Result<Box<dyn Reader>> {
        let def = self
            .defs
            .iter_mut()
            .find(|d| d.kind == kind)
            .ok_or(InputError::UnknownReader(kind))?;

        if let Some(init) = def.init.take() {
            if init() {
                debug!(name = def.name, "reader initialized");
            } else {
                // disable the factory for all time
                def.factory = None;
                error!(name = def.name, "reader init failed, kind disabled");
                return Err(InputError::ReaderInitFailed { name: def.name });
            }
        }

        match &def.factory {
            Some(factory) => Ok(factory()),
            None => Err(InputError::ReaderDisabled { name: def.name }),
        }
    }
}
