//! Content-addressed row fingerprints
//!
//! A [`Fingerprint`] keys the per-stream `prev`/`curr` dictionaries. It is
//! the canonical encoding of a cell slice, compared byte-exact: identical
//! slices always collide, distinct encodings never do. No cryptographic
//! strength is assumed or needed.

use std::fmt;

use crate::cell::Cell;

/// Opaque dictionary key derived from a slice of cells.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bytes: Box<[u8]>,
}

impl Fingerprint {
    /// Fingerprint a cell slice via the canonical encoding.
    pub fn of(cells: &[Cell]) -> Self {
        let mut buf = Vec::new();
        for cell in cells {
            cell.encode_into(&mut buf);
        }
        Self {
            bytes: buf.into_boxed_slice(),
        }
    }

    /// The canonical encoding backing this key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint(")?;
        for b in self.bytes.iter() {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_rows_collide() {
        let a = [Cell::Count(1), Cell::Str("x".into())];
        let b = [Cell::Count(1), Cell::Str("x".into())];
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_distinct_values_differ() {
        let a = Fingerprint::of(&[Cell::Count(1)]);
        let b = Fingerprint::of(&[Cell::Count(2)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_usable_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(Fingerprint::of(&[Cell::Int(5)]), "entry");
        assert_eq!(map.get(&Fingerprint::of(&[Cell::Int(5)])), Some(&"entry"));
    }

    #[test]
    fn test_debug_is_hex() {
        let fp = Fingerprint::of(&[Cell::Port(1)]);
        assert_eq!(format!("{fp:?}"), "Fingerprint(0100)");
    }
}
