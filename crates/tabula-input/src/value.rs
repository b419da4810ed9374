//! Host value vocabulary
//!
//! The dynamic types the host runtime works with: [`Kind`] tags, the
//! [`Value`] sum type, and [`RecordType`] descriptors that drive schema
//! unrolling and row marshalling. The manager never interprets values
//! beyond what the schema dictates; ownership of a value placed in a
//! destination table transfers to the table.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Type tag shared by cells, schema leaves, and host values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Bool,
    Int,
    Count,
    Counter,
    Port,
    Subnet,
    Addr,
    Double,
    Time,
    Interval,
    Enum,
    String,
    Set,
    Vector,
    Record,
}

impl Kind {
    /// Whether this kind is atomic (usable inside sets and vectors, and as
    /// a bare schema leaf).
    pub fn is_atomic(self) -> bool {
        !matches!(self, Kind::Set | Kind::Vector | Kind::Record)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Count => "count",
            Kind::Counter => "counter",
            Kind::Port => "port",
            Kind::Subnet => "subnet",
            Kind::Addr => "addr",
            Kind::Double => "double",
            Kind::Time => "time",
            Kind::Interval => "interval",
            Kind::Enum => "enum",
            Kind::String => "string",
            Kind::Set => "set",
            Kind::Vector => "vector",
            Kind::Record => "record",
        };
        f.write_str(name)
    }
}

/// A network prefix: address plus prefix width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    /// Network address (host bits are the reader's business; the manager
    /// encodes what it is given)
    pub addr: IpAddr,
    /// Prefix width in bits
    pub prefix: u8,
}

impl Subnet {
    pub fn new(addr: IpAddr, prefix: u8) -> Self {
        Self { addr, prefix }
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// Expand an address to its sixteen-octet form (IPv4 maps to `::ffff:a.b.c.d`),
/// i.e. four 32-bit words.
pub(crate) fn addr_octets(addr: &IpAddr) -> [u8; 16] {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

/// A dynamic host value.
///
/// `List` is the composite form a table index takes when it spans more than
/// one leaf; single-leaf indices stay bare.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Count(u64),
    Port(u16),
    Addr(IpAddr),
    Subnet(Subnet),
    Double(f64),
    Time(f64),
    Interval(f64),
    Enum(String),
    Str(String),
    /// Ordered named fields
    Record(Vec<(String, Value)>),
    Set(Vec<Value>),
    Vector(Vec<Value>),
    /// Composite table index
    List(Vec<Value>),
}

impl Value {
    /// The type tag of this value. `Counter` cells collapse into `Count`
    /// on the host side, so `Counter` never appears here.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Count(_) => Kind::Count,
            Value::Port(_) => Kind::Port,
            Value::Addr(_) => Kind::Addr,
            Value::Subnet(_) => Kind::Subnet,
            Value::Double(_) => Kind::Double,
            Value::Time(_) => Kind::Time,
            Value::Interval(_) => Kind::Interval,
            Value::Enum(_) => Kind::Enum,
            Value::Str(_) => Kind::String,
            Value::Record(_) | Value::List(_) => Kind::Record,
            Value::Set(_) => Kind::Set,
            Value::Vector(_) => Kind::Vector,
        }
    }

    /// Convenience constructor for an IPv4 address value.
    pub fn addr_v4(a: u8, b: u8, c: u8, d: u8) -> Self {
        Value::Addr(IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
    }

    /// Convenience constructor for an IPv6 address value.
    pub fn addr_v6(segments: [u16; 8]) -> Self {
        Value::Addr(IpAddr::V6(Ipv6Addr::from(segments)))
    }
}

/// The declared type of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// An atomic leaf; the kind must satisfy [`Kind::is_atomic`]
    Atom(Kind),
    /// A set whose index is the given atomic kind
    Set(Kind),
    /// A vector yielding the given atomic kind
    Vector(Kind),
    /// A nested record, flattened in place during unrolling
    Record(Arc<RecordType>),
}

impl FieldType {
    /// The tag a cell for this field must carry.
    pub fn kind(&self) -> Kind {
        match self {
            FieldType::Atom(k) => *k,
            FieldType::Set(_) => Kind::Set,
            FieldType::Vector(_) => Kind::Vector,
            FieldType::Record(_) => Kind::Record,
        }
    }
}

/// One named field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

/// A host record type: named fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    name: String,
    fields: Vec<Field>,
}

impl RecordType {
    /// Create an empty record type with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style).
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
        });
        self
    }

    /// The type's name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_atomicity() {
        assert!(Kind::Addr.is_atomic());
        assert!(Kind::Enum.is_atomic());
        assert!(!Kind::Set.is_atomic());
        assert!(!Kind::Vector.is_atomic());
        assert!(!Kind::Record.is_atomic());
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::Count(3).kind(), Kind::Count);
        assert_eq!(Value::addr_v4(10, 0, 0, 1).kind(), Kind::Addr);
        assert_eq!(Value::List(vec![]).kind(), Kind::Record);
    }

    #[test]
    fn test_addr_octets_v4_mapped() {
        let octets = addr_octets(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(&octets[..12], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff]);
        assert_eq!(&octets[12..], &[10, 0, 0, 1]);
    }

    #[test]
    fn test_record_type_builder() {
        let rt = RecordType::new("Conn")
            .field("host", FieldType::Atom(Kind::Addr))
            .field("svc", FieldType::Set(Kind::String));
        assert_eq!(rt.num_fields(), 2);
        assert_eq!(rt.fields()[1].ty.kind(), Kind::Set);
    }
}
