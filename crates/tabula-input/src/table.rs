//! Destination table abstraction
//!
//! The manager keeps a host table in sync with each stream but never looks
//! inside it: the [`Table`] trait is the value-store seam. The table
//! computes its own opaque [`TableKey`] for an index value; the manager
//! stores that key alongside each tracked entry and replays it later to
//! recover or delete the row without rebuilding the index.
//!
//! [`MemoryTable`] is the in-crate store used by hosts and tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::value::{addr_octets, Value};

/// Opaque per-table key for an index value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TableKey(Box<[u8]>);

impl TableKey {
    /// Wrap raw key material produced by a table.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableKey(")?;
        for b in self.0.iter() {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

/// A host table the manager can keep in sync with a stream.
///
/// Ownership of assigned values transfers to the table. Implementations
/// must be able to recover the index value from a previously issued key.
pub trait Table: Send + Sync {
    /// The table's own key for an index value.
    fn key_of(&self, index: &Value) -> Result<TableKey>;

    /// Insert or replace the row at `key`.
    fn assign(&mut self, key: TableKey, index: Value, value: Value);

    /// Current value for an index, if present.
    fn get(&self, index: &Value) -> Option<Value>;

    /// Current value for a previously issued key, if present.
    fn get_by_key(&self, key: &TableKey) -> Option<Value>;

    /// Rebuild the index value a key was issued for, if present.
    fn recover_index(&self, key: &TableKey) -> Option<Value>;

    /// Remove by index value. Returns whether a row was removed.
    fn remove(&mut self, index: &Value) -> bool;

    /// Remove by previously issued key. Returns whether a row was removed.
    fn remove_by_key(&mut self, key: &TableKey) -> bool;

    /// Drop every row.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handle to a destination table, co-owned by manager and host.
pub type SharedTable = Arc<RwLock<dyn Table>>;

/// Simple in-memory [`Table`] keyed by a canonical index encoding.
#[derive(Default)]
pub struct MemoryTable {
    rows: HashMap<TableKey, (Value, Value)>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table already wrapped as a [`SharedTable`].
    pub fn shared() -> SharedTable {
        let table: SharedTable = Arc::new(RwLock::new(Self::new()));
        table
    }
}

impl Table for MemoryTable {
    fn key_of(&self, index: &Value) -> Result<TableKey> {
        let mut buf = Vec::new();
        encode_value(&mut buf, index);
        Ok(TableKey::new(buf))
    }

    fn assign(&mut self, key: TableKey, index: Value, value: Value) {
        self.rows.insert(key, (index, value));
    }

    fn get(&self, index: &Value) -> Option<Value> {
        let key = self.key_of(index).ok()?;
        self.get_by_key(&key)
    }

    fn get_by_key(&self, key: &TableKey) -> Option<Value> {
        self.rows.get(key).map(|(_, v)| v.clone())
    }

    fn recover_index(&self, key: &TableKey) -> Option<Value> {
        self.rows.get(key).map(|(idx, _)| idx.clone())
    }

    fn remove(&mut self, index: &Value) -> bool {
        match self.key_of(index) {
            Ok(key) => self.rows.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    fn remove_by_key(&mut self, key: &TableKey) -> bool {
        self.rows.remove(key).is_some()
    }

    fn clear(&mut self) {
        self.rows.clear();
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

// Canonical index encoding for MemoryTable keys. Unlike the fingerprint
// encoding this one is tag- and length-prefixed: table keys outlive the
// per-stream schema scope, so they must be self-delimiting.
fn encode_value(buf: &mut Vec<u8>, v: &Value) {
    match v {
        Value::Bool(b) => {
            buf.push(0x01);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(0x02);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Count(c) => {
            buf.push(0x03);
            buf.extend_from_slice(&c.to_le_bytes());
        }
        Value::Port(p) => {
            buf.push(0x04);
            buf.extend_from_slice(&p.to_le_bytes());
        }
        Value::Addr(a) => {
            buf.push(0x05);
            buf.extend_from_slice(&addr_octets(a));
        }
        Value::Subnet(s) => {
            buf.push(0x06);
            buf.push(s.prefix);
            buf.extend_from_slice(&addr_octets(&s.addr));
        }
        Value::Double(d) => {
            buf.push(0x07);
            buf.extend_from_slice(&d.to_bits().to_le_bytes());
        }
        Value::Time(t) => {
            buf.push(0x08);
            buf.extend_from_slice(&t.to_bits().to_le_bytes());
        }
        Value::Interval(i) => {
            buf.push(0x09);
            buf.extend_from_slice(&i.to_bits().to_le_bytes());
        }
        Value::Enum(s) => {
            buf.push(0x0a);
            encode_bytes(buf, s.as_bytes());
        }
        Value::Str(s) => {
            buf.push(0x0b);
            encode_bytes(buf, s.as_bytes());
        }
        Value::Record(fields) => {
            buf.push(0x0c);
            buf.extend_from_slice(&(fields.len() as u32).to_le_bytes());
            for (name, value) in fields {
                encode_bytes(buf, name.as_bytes());
                encode_value(buf, value);
            }
        }
        Value::Set(items) => {
            buf.push(0x0d);
            encode_items(buf, items);
        }
        Value::Vector(items) => {
            buf.push(0x0e);
            encode_items(buf, items);
        }
        Value::List(items) => {
            buf.push(0x0f);
            encode_items(buf, items);
        }
    }
}

fn encode_items(buf: &mut Vec<u8>, items: &[Value]) {
    buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        encode_value(buf, item);
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}
