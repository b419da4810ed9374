//! Schema unrolling
//!
//! Turns a pair of host record types into the flat positional schema a
//! reader produces rows against. Nested records flatten in declaration
//! order with dotted names; every visited field must pass the
//! compatibility check (any atomic kind, sets over an atomic index,
//! vectors over an atomic yield — records inside containers are rejected).

use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};
use crate::value::{FieldType, Kind, RecordType};

/// Flattened-leaf description handed to readers.
///
/// `inner` is present iff `kind` is `set` or `vector`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Dotted field name, e.g. `conn.orig.host`
    pub name: String,
    /// Leaf type tag
    pub kind: Kind,
    /// Element kind for containers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Kind>,
}

/// Whether a declared field type may appear in an input schema.
pub fn is_compatible(ty: &FieldType) -> bool {
    match ty {
        FieldType::Atom(k) => k.is_atomic(),
        FieldType::Set(elem) | FieldType::Vector(elem) => elem.is_atomic(),
        // records flatten; their fields are checked as they are visited
        FieldType::Record(_) => true,
    }
}

/// Flatten `rec` onto `fields` in declaration order, prefixing nested field
/// names with `prefix`.
pub fn unroll_record_type(
    fields: &mut Vec<FieldSpec>,
    rec: &RecordType,
    prefix: &str,
) -> Result<()> {
    for field in rec.fields() {
        let dotted = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}{}", field.name)
        };

        if !is_compatible(&field.ty) {
            return Err(InputError::IncompatibleField {
                field: dotted,
                detail: describe(&field.ty),
            });
        }

        match &field.ty {
            FieldType::Record(nested) => {
                let nested_prefix = format!("{dotted}.");
                unroll_record_type(fields, nested, &nested_prefix)?;
            }
            FieldType::Atom(k) => fields.push(FieldSpec {
                name: dotted,
                kind: *k,
                inner: None,
            }),
            FieldType::Set(elem) => fields.push(FieldSpec {
                name: dotted,
                kind: Kind::Set,
                inner: Some(*elem),
            }),
            FieldType::Vector(elem) => fields.push(FieldSpec {
                name: dotted,
                kind: Kind::Vector,
                inner: Some(*elem),
            }),
        }
    }

    Ok(())
}

fn describe(ty: &FieldType) -> String {
    match ty {
        FieldType::Atom(k) => format!("`{k}` is not an atomic input type"),
        FieldType::Set(elem) => format!("set over non-atomic index `{elem}`"),
        FieldType::Vector(elem) => format!("vector over non-atomic yield `{elem}`"),
        FieldType::Record(r) => format!("record `{}`", r.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_flat_record_unrolls_in_order() {
        let rt = RecordType::new("R")
            .field("a", FieldType::Atom(Kind::Addr))
            .field("b", FieldType::Atom(Kind::Count));
        let mut fields = Vec::new();
        unroll_record_type(&mut fields, &rt, "").unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[1].kind, Kind::Count);
    }

    #[test]
    fn test_nested_record_gets_dotted_names() {
        let inner = RecordType::new("Inner")
            .field("x", FieldType::Atom(Kind::Int))
            .field("y", FieldType::Atom(Kind::Int));
        let rt = RecordType::new("Outer")
            .field("id", FieldType::Atom(Kind::Count))
            .field("pos", FieldType::Record(Arc::new(inner)));
        let mut fields = Vec::new();
        unroll_record_type(&mut fields, &rt, "").unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "pos.x", "pos.y"]);
    }

    #[test]
    fn test_container_leaves_carry_inner_kind() {
        let rt = RecordType::new("R")
            .field("tags", FieldType::Set(Kind::String))
            .field("ports", FieldType::Vector(Kind::Port));
        let mut fields = Vec::new();
        unroll_record_type(&mut fields, &rt, "").unwrap();
        assert_eq!(fields[0].inner, Some(Kind::String));
        assert_eq!(fields[1].kind, Kind::Vector);
        assert_eq!(fields[1].inner, Some(Kind::Port));
    }

    #[test]
    fn test_record_inside_container_rejected() {
        let rt = RecordType::new("R").field("bad", FieldType::Set(Kind::Record));
        let mut fields = Vec::new();
        let err = unroll_record_type(&mut fields, &rt, "").unwrap_err();
        assert!(matches!(err, InputError::IncompatibleField { field, .. } if field == "bad"));
    }

    #[test]
    fn test_non_atomic_atom_rejected() {
        let rt = RecordType::new("R").field("bad", FieldType::Atom(Kind::Set));
        let mut fields = Vec::new();
        assert!(unroll_record_type(&mut fields, &rt, "").is_err());
    }

    #[test]
    fn test_error_names_nested_field() {
        let inner = RecordType::new("Inner").field("deep", FieldType::Vector(Kind::Record));
        let rt = RecordType::new("Outer").field("pos", FieldType::Record(Arc::new(inner)));
        let mut fields = Vec::new();
        let err = unroll_record_type(&mut fields, &rt, "").unwrap_err();
        assert!(matches!(err, InputError::IncompatibleField { field, .. } if field == "pos.deep"));
    }
}
