//! Row-to-value marshalling
//!
//! Schema-driven conversion from a flat positional row of [`Cell`]s to the
//! structured host values that land in a destination table. The walk is
//! purely type-directed: record fields recurse sharing one position cursor,
//! every other field consumes exactly one cell. Callers check the cursor
//! against the expected leaf count afterwards.

use crate::cell::Cell;
use crate::error::{InputError, Result};
use crate::value::{FieldType, Kind, RecordType, Value};

/// Convert a single cell to a host value.
///
/// When `expected` is given, a differing cell tag is a contract break by
/// the reader. Container cells convert their items against the carried
/// element kind; a contradicting item is likewise a contract break.
pub fn cell_to_value(cell: &Cell, expected: Option<Kind>) -> Result<Value> {
    if let Some(expected) = expected {
        if expected != cell.kind() {
            return Err(InputError::CellMismatch {
                expected,
                found: cell.kind(),
            });
        }
    }

    let value = match cell {
        Cell::Bool(b) => Value::Bool(*b),
        Cell::Int(i) => Value::Int(*i),
        // counters collapse into counts on the host side
        Cell::Count(c) | Cell::Counter(c) => Value::Count(*c),
        Cell::Port(p) => Value::Port(*p),
        Cell::Addr(a) => Value::Addr(*a),
        Cell::Subnet(s) => Value::Subnet(*s),
        Cell::Double(d) => Value::Double(*d),
        Cell::Time(t) => Value::Time(*t),
        Cell::Interval(i) => Value::Interval(*i),
        Cell::Enum(e) => Value::Enum(e.clone()),
        Cell::Str(s) => Value::Str(s.clone()),
        Cell::Set { elem, items } => Value::Set(items_to_values(*elem, items)?),
        Cell::Vector { elem, items } => Value::Vector(items_to_values(*elem, items)?),
    };

    Ok(value)
}

fn items_to_values(elem: Kind, items: &[Cell]) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        if item.kind() != elem {
            return Err(InputError::ContainerElement {
                declared: elem,
                found: item.kind(),
            });
        }
        values.push(cell_to_value(item, Some(elem))?);
    }
    Ok(values)
}

/// Build a record of `rec` from `row`, consuming cells at `*pos`.
///
/// Record-typed fields recurse with the same cursor; every other field
/// consumes exactly one cell. On return the cursor points just past the
/// last consumed cell; the caller checks it against the expected count.
pub fn row_to_record(row: &[Cell], rec: &RecordType, pos: &mut usize) -> Result<Value> {
    let mut fields = Vec::with_capacity(rec.num_fields());

    for field in rec.fields() {
        let value = match &field.ty {
            FieldType::Record(nested) => row_to_record(row, nested, pos)?,
            other => {
                let cell = row.get(*pos).ok_or_else(|| {
                    InputError::internal(format!(
                        "row exhausted at cell {} while building record `{}`",
                        pos,
                        rec.name()
                    ))
                })?;
                let value = cell_to_value(cell, Some(other.kind()))?;
                *pos += 1;
                value
            }
        };
        fields.push((field.name.clone(), value));
    }

    Ok(Value::Record(fields))
}

/// Build the table-index value from the index half of a row.
///
/// A single non-record leaf yields a bare value; anything else yields an
/// ordered [`Value::List`] walked in declaration order. `row` must be
/// exactly the index half.
pub fn row_to_index(row: &[Cell], idx_count: usize, rec: &RecordType) -> Result<Value> {
    let single_bare = idx_count == 1
        && rec.num_fields() == 1
        && !matches!(rec.fields()[0].ty, FieldType::Record(_));

    if single_bare {
        let cell = row
            .first()
            .ok_or_else(|| InputError::internal("empty row for single-leaf index"))?;
        return cell_to_value(cell, Some(rec.fields()[0].ty.kind()));
    }

    let mut pos = 0;
    let mut items = Vec::with_capacity(rec.num_fields());
    for field in rec.fields() {
        let value = match &field.ty {
            FieldType::Record(nested) => row_to_record(row, nested, &mut pos)?,
            other => {
                let cell = row.get(pos).ok_or_else(|| {
                    InputError::internal(format!(
                        "row exhausted at cell {pos} while building index of `{}`",
                        rec.name()
                    ))
                })?;
                let value = cell_to_value(cell, Some(other.kind()))?;
                pos += 1;
                value
            }
        };
        items.push(value);
    }

    if pos != idx_count {
        return Err(InputError::CursorMismatch {
            consumed: pos,
            expected: idx_count,
        });
    }

    Ok(Value::List(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_atomic_conversion() {
        let v = cell_to_value(&Cell::Count(9), Some(Kind::Count)).unwrap();
        assert_eq!(v, Value::Count(9));
    }

    #[test]
    fn test_counter_collapses_to_count() {
        let v = cell_to_value(&Cell::Counter(3), Some(Kind::Counter)).unwrap();
        assert_eq!(v, Value::Count(3));
    }

    #[test]
    fn test_tag_mismatch_rejected() {
        let err = cell_to_value(&Cell::Count(9), Some(Kind::Int)).unwrap_err();
        assert!(matches!(
            err,
            InputError::CellMismatch {
                expected: Kind::Int,
                found: Kind::Count
            }
        ));
    }

    #[test]
    fn test_set_conversion_checks_uniformity() {
        let good = Cell::set(Kind::String, vec![Cell::Str("a".into()), Cell::Str("b".into())]);
        assert_eq!(
            cell_to_value(&good, None).unwrap(),
            Value::Set(vec![Value::Str("a".into()), Value::Str("b".into())])
        );

        let bad = Cell::set(Kind::String, vec![Cell::Str("a".into()), Cell::Count(1)]);
        assert!(matches!(
            cell_to_value(&bad, None).unwrap_err(),
            InputError::ContainerElement { .. }
        ));
    }

    #[test]
    fn test_empty_container_is_well_typed() {
        let v = cell_to_value(&Cell::set(Kind::Port, vec![]), None).unwrap();
        assert_eq!(v, Value::Set(vec![]));
    }

    // pins the fix for converting vector items from the vector itself
    #[test]
    fn test_vector_converts_own_items() {
        let vec_cell = Cell::vector(Kind::Count, vec![Cell::Count(10), Cell::Count(20)]);
        assert_eq!(
            cell_to_value(&vec_cell, None).unwrap(),
            Value::Vector(vec![Value::Count(10), Value::Count(20)])
        );
    }

    #[test]
    fn test_row_to_record_nested_shares_cursor() {
        let inner = RecordType::new("Inner")
            .field("x", FieldType::Atom(Kind::Int))
            .field("y", FieldType::Atom(Kind::Int));
        let rec = RecordType::new("Outer")
            .field("id", FieldType::Atom(Kind::Count))
            .field("pos", FieldType::Record(Arc::new(inner)))
            .field("tag", FieldType::Atom(Kind::String));
        let row = vec![
            Cell::Count(7),
            Cell::Int(1),
            Cell::Int(2),
            Cell::Str("t".into()),
        ];
        let mut pos = 0;
        let v = row_to_record(&row, &rec, &mut pos).unwrap();
        assert_eq!(pos, 4);
        assert_eq!(
            v,
            Value::Record(vec![
                ("id".into(), Value::Count(7)),
                (
                    "pos".into(),
                    Value::Record(vec![
                        ("x".into(), Value::Int(1)),
                        ("y".into(), Value::Int(2)),
                    ])
                ),
                ("tag".into(), Value::Str("t".into())),
            ])
        );
    }

    #[test]
    fn test_single_leaf_index_is_bare() {
        let rec = RecordType::new("Idx").field("host", FieldType::Atom(Kind::Addr));
        let row = vec![Cell::Addr("10.0.0.1".parse().unwrap())];
        let v = row_to_index(&row, 1, &rec).unwrap();
        assert_eq!(v, Value::addr_v4(10, 0, 0, 1));
    }

    #[test]
    fn test_composite_index_is_list() {
        let rec = RecordType::new("Idx")
            .field("host", FieldType::Atom(Kind::Addr))
            .field("port", FieldType::Atom(Kind::Port));
        let row = vec![Cell::Addr("10.0.0.1".parse().unwrap()), Cell::Port(80)];
        let v = row_to_index(&row, 2, &rec).unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::addr_v4(10, 0, 0, 1), Value::Port(80)])
        );
    }

    #[test]
    fn test_index_cursor_mismatch_detected() {
        let rec = RecordType::new("Idx").field("host", FieldType::Atom(Kind::Addr));
        let row = vec![Cell::Addr("10.0.0.1".parse().unwrap()), Cell::Port(80)];
        // claims two index cells but the type only consumes one
        let err = row_to_index(&row, 2, &rec).unwrap_err();
        assert!(matches!(
            err,
            InputError::CursorMismatch {
                consumed: 1,
                expected: 2
            }
        ));
    }
}
