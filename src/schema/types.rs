//! Native column types.
//!
//! This module defines the typed descriptor a column's type string parses
//! into. Every variant maps to exactly one wire encoding.

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Widest decimal precision the format can carry (256-bit storage).
pub const MAX_DECIMAL_PRECISION: u32 = 76;

/// Typed descriptor of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    // Fixed-width integers
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,

    // Floating point
    Float32,
    Float64,

    /// One byte per row, `1` is true.
    Bool,

    // Text
    /// Varint length-prefixed UTF-8.
    String,
    /// Exactly N bytes per row, padding kept.
    FixedString(usize),

    // Temporal
    /// Days since 1970-01-01 as u16.
    Date,
    /// Days since 1970-01-01 as i32.
    Date32,
    /// Unix seconds as u32. The timezone is kept for display only; values
    /// decode as UTC.
    DateTime { timezone: Option<String> },
    /// Signed ticks of `10^-precision` seconds.
    DateTime64 {
        precision: u32,
        timezone: Option<String>,
    },

    // Identifiers
    Uuid,
    Ipv4,
    Ipv6,

    /// Fixed-point decimal; storage width follows precision.
    Decimal { precision: u32, scale: u32 },

    /// Enum8 with its raw `'name' = value` definitions. Decodes as Int8.
    Enum8(Vec<String>),
    /// Enum16 with its raw `'name' = value` definitions. Decodes as Int16.
    Enum16(Vec<String>),

    /// Type of a bare NULL; one placeholder byte per row.
    Nothing,

    // Containers
    Nullable(Box<ColumnType>),
    LowCardinality(Box<ColumnType>),
    Array(Box<ColumnType>),
    Tuple(Vec<TupleElement>),
    Map(Box<ColumnType>, Box<ColumnType>),
}

/// One element of a tuple type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    /// Element name for named tuples.
    pub name: Option<String>,
    /// Element type.
    pub ty: ColumnType,
}

impl TupleElement {
    /// An unnamed element.
    pub fn unnamed(ty: ColumnType) -> Self {
        Self { name: None, ty }
    }

    /// A named element.
    pub fn named(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }
}

impl ColumnType {
    /// Parse a type string.
    pub fn parse(type_str: &str) -> Result<Self, SchemaError> {
        crate::schema::parse_column_type(type_str)
    }

    /// Byte width of one value for types stored as contiguous fixed-width
    /// little-endian groups.
    pub fn fixed_width(&self) -> Option<usize> {
        let width = match self {
            ColumnType::UInt8 | ColumnType::Int8 | ColumnType::Bool | ColumnType::Enum8(_) => 1,
            ColumnType::UInt16 | ColumnType::Int16 | ColumnType::Date | ColumnType::Enum16(_) => 2,
            ColumnType::UInt32
            | ColumnType::Int32
            | ColumnType::Float32
            | ColumnType::Date32
            | ColumnType::DateTime { .. }
            | ColumnType::Ipv4 => 4,
            ColumnType::UInt64
            | ColumnType::Int64
            | ColumnType::Float64
            | ColumnType::DateTime64 { .. } => 8,
            ColumnType::UInt128 | ColumnType::Int128 | ColumnType::Uuid | ColumnType::Ipv6 => 16,
            ColumnType::UInt256 | ColumnType::Int256 => 32,
            ColumnType::FixedString(n) => *n,
            ColumnType::Decimal { precision, .. } => decimal_storage_width(*precision),
            _ => return None,
        };
        Some(width)
    }

    /// Whether values of this type can be null.
    pub fn is_nullable(&self) -> bool {
        match self {
            ColumnType::Nullable(_) | ColumnType::Nothing => true,
            ColumnType::LowCardinality(inner) => inner.is_nullable(),
            _ => false,
        }
    }
}

/// Storage width in bytes of a decimal with the given precision.
pub fn decimal_storage_width(precision: u32) -> usize {
    match precision {
        0..=9 => 4,
        10..=18 => 8,
        19..=38 => 16,
        _ => 32,
    }
}

/// Precision implied by a `DecimalN(S)` alias.
pub fn decimal_precision_for_bits(bits: u32) -> u32 {
    match bits {
        32 => 9,
        64 => 18,
        128 => 38,
        _ => MAX_DECIMAL_PRECISION,
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::UInt8 => f.write_str("UInt8"),
            ColumnType::UInt16 => f.write_str("UInt16"),
            ColumnType::UInt32 => f.write_str("UInt32"),
            ColumnType::UInt64 => f.write_str("UInt64"),
            ColumnType::UInt128 => f.write_str("UInt128"),
            ColumnType::UInt256 => f.write_str("UInt256"),
            ColumnType::Int8 => f.write_str("Int8"),
            ColumnType::Int16 => f.write_str("Int16"),
            ColumnType::Int32 => f.write_str("Int32"),
            ColumnType::Int64 => f.write_str("Int64"),
            ColumnType::Int128 => f.write_str("Int128"),
            ColumnType::Int256 => f.write_str("Int256"),
            ColumnType::Float32 => f.write_str("Float32"),
            ColumnType::Float64 => f.write_str("Float64"),
            ColumnType::Bool => f.write_str("Bool"),
            ColumnType::String => f.write_str("String"),
            ColumnType::FixedString(n) => write!(f, "FixedString({})", n),
            ColumnType::Date => f.write_str("Date"),
            ColumnType::Date32 => f.write_str("Date32"),
            ColumnType::DateTime { timezone: None } => f.write_str("DateTime"),
            ColumnType::DateTime { timezone: Some(tz) } => write!(f, "DateTime('{}')", tz),
            ColumnType::DateTime64 {
                precision,
                timezone: None,
            } => write!(f, "DateTime64({})", precision),
            ColumnType::DateTime64 {
                precision,
                timezone: Some(tz),
            } => write!(f, "DateTime64({}, '{}')", precision, tz),
            ColumnType::Uuid => f.write_str("UUID"),
            ColumnType::Ipv4 => f.write_str("IPv4"),
            ColumnType::Ipv6 => f.write_str("IPv6"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "Decimal({}, {})", precision, scale)
            }
            ColumnType::Enum8(values) => write!(f, "Enum8({})", values.join(", ")),
            ColumnType::Enum16(values) => write!(f, "Enum16({})", values.join(", ")),
            ColumnType::Nothing => f.write_str("Nothing"),
            ColumnType::Nullable(inner) => write!(f, "Nullable({})", inner),
            ColumnType::LowCardinality(inner) => write!(f, "LowCardinality({})", inner),
            ColumnType::Array(inner) => write!(f, "Array({})", inner),
            ColumnType::Tuple(elements) => {
                f.write_str("Tuple(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(name) = &element.name {
                        write!(f, "{} ", name)?;
                    }
                    write!(f, "{}", element.ty)?;
                }
                f.write_str(")")
            }
            ColumnType::Map(key, value) => write!(f, "Map({}, {})", key, value),
        }
    }
}
