//! Columnar values and batches.
//!
//! [`ColumnarBatch`] is the decoder's output: one typed [`ColumnVector`] per
//! top-level schema field, aligned 1:1 with the input row order. Nested
//! values (array elements, map entries, struct members below the first
//! level of struct nesting) are represented as [`Scalar`]s.

use std::fmt;

use crate::error::{Error, TableResult};
use crate::schema::{DataType, DecimalType, StructField, StructType};

mod json;

pub use json::parse_json;

/// A single typed value, or a typed null.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Decimal(DecimalValue),
    /// Days since 1970-01-01, negative before the epoch.
    Date(i32),
    /// Microseconds since the unix epoch, UTC.
    Timestamp(i64),
    Array(ArrayValue),
    Map(MapValue),
    Struct(StructValue),
    Null(DataType),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null(_))
    }
}

/// An exact decimal: unscaled integer plus the declared precision and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalValue {
    unscaled: i128,
    ty: DecimalType,
}

impl DecimalValue {
    pub fn new(unscaled: i128, ty: DecimalType) -> Self {
        Self { unscaled, ty }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn precision(&self) -> u8 {
        self.ty.precision()
    }

    pub fn scale(&self) -> u8 {
        self.ty.scale()
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = self.ty.scale() as u32;
        if scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let pow = 10i128.pow(scale);
        let int = self.unscaled / pow;
        let frac = (self.unscaled % pow).unsigned_abs();
        let sign = if self.unscaled < 0 && int == 0 { "-" } else { "" };
        write!(f, "{sign}{int}.{frac:0width$}", width = scale as usize)
    }
}

/// Elements of an array value. Null elements are [`Scalar::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    elements: Vec<Scalar>,
}

impl ArrayValue {
    pub fn new(elements: Vec<Scalar>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Scalar] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Entries of a map value, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    entries: Vec<(Scalar, Scalar)>,
}

impl MapValue {
    pub fn new(entries: Vec<(Scalar, Scalar)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(Scalar, Scalar)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Member values of a struct, aligned with its schema's field order. Null
/// members are [`Scalar::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    values: Vec<Scalar>,
}

impl StructValue {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }
}

/// Typed storage for one top-level column of a batch.
///
/// The typed getters return `None` for null rows.
///
/// # Panics
///
/// Each getter panics when called on a column of a different type, and
/// row-indexed accessors panic when `row` is out of bounds. Both indicate a
/// caller bug, not a data error.
#[derive(Debug)]
pub enum ColumnVector {
    Boolean(Vec<Option<bool>>),
    Byte(Vec<Option<i8>>),
    Short(Vec<Option<i16>>),
    Integer(Vec<Option<i32>>),
    Long(Vec<Option<i64>>),
    Float(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Binary(Vec<Option<Vec<u8>>>),
    Decimal(DecimalType, Vec<Option<i128>>),
    Date(Vec<Option<i32>>),
    Timestamp(Vec<Option<i64>>),
    Array(Vec<Option<ArrayValue>>),
    Map(Vec<Option<MapValue>>),
    Struct(StructColumn),
}

/// A struct column stores its members as child columns plus a struct-level
/// null mask. A null struct row is null in the mask and null in every child.
#[derive(Debug)]
pub struct StructColumn {
    fields: Vec<StructField>,
    nulls: Vec<bool>,
    columns: Vec<ColumnVector>,
}

impl StructColumn {
    pub fn fields(&self) -> &[StructField] {
        &self.fields
    }

    pub fn child(&self, index: usize) -> &ColumnVector {
        &self.columns[index]
    }

    pub fn child_by_name(&self, name: &str) -> Option<&ColumnVector> {
        let index = self.fields.iter().position(|f| f.name() == name)?;
        Some(&self.columns[index])
    }
}

macro_rules! copied_getter {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self, row: usize) -> Option<$ty> {
            match self {
                ColumnVector::$variant(values) => values[row],
                other => panic!(
                    concat!(stringify!($name), " called on a {} column"),
                    other.type_name()
                ),
            }
        }
    };
}

macro_rules! ref_getter {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self, row: usize) -> Option<&$ty> {
            match self {
                ColumnVector::$variant(values) => values[row].as_ref(),
                other => panic!(
                    concat!(stringify!($name), " called on a {} column"),
                    other.type_name()
                ),
            }
        }
    };
}

impl ColumnVector {
    /// An empty column of the given type, ready to receive values.
    pub(crate) fn new_empty(data_type: &DataType) -> Self {
        use crate::schema::PrimitiveType as P;
        match data_type {
            DataType::Primitive(P::Boolean) => Self::Boolean(vec![]),
            DataType::Primitive(P::Byte) => Self::Byte(vec![]),
            DataType::Primitive(P::Short) => Self::Short(vec![]),
            DataType::Primitive(P::Integer) => Self::Integer(vec![]),
            DataType::Primitive(P::Long) => Self::Long(vec![]),
            DataType::Primitive(P::Float) => Self::Float(vec![]),
            DataType::Primitive(P::Double) => Self::Double(vec![]),
            DataType::Primitive(P::String) => Self::String(vec![]),
            DataType::Primitive(P::Binary) => Self::Binary(vec![]),
            DataType::Primitive(P::Date) => Self::Date(vec![]),
            DataType::Primitive(P::Timestamp) => Self::Timestamp(vec![]),
            DataType::Primitive(P::Decimal(ty)) => Self::Decimal(*ty, vec![]),
            DataType::Array(_) => Self::Array(vec![]),
            DataType::Map(_) => Self::Map(vec![]),
            DataType::Struct(inner) => Self::Struct(StructColumn {
                fields: inner.fields().cloned().collect(),
                nulls: vec![],
                columns: inner
                    .fields()
                    .map(|f| ColumnVector::new_empty(f.data_type()))
                    .collect(),
            }),
        }
    }

    pub(crate) fn push_null(&mut self) {
        match self {
            Self::Boolean(v) => v.push(None),
            Self::Byte(v) => v.push(None),
            Self::Short(v) => v.push(None),
            Self::Integer(v) => v.push(None),
            Self::Long(v) => v.push(None),
            Self::Float(v) => v.push(None),
            Self::Double(v) => v.push(None),
            Self::String(v) => v.push(None),
            Self::Binary(v) => v.push(None),
            Self::Decimal(_, v) => v.push(None),
            Self::Date(v) => v.push(None),
            Self::Timestamp(v) => v.push(None),
            Self::Array(v) => v.push(None),
            Self::Map(v) => v.push(None),
            Self::Struct(column) => {
                column.nulls.push(true);
                for child in &mut column.columns {
                    child.push_null();
                }
            }
        }
    }

    pub(crate) fn push_scalar(&mut self, scalar: Scalar) -> TableResult<()> {
        if scalar.is_null() {
            self.push_null();
            return Ok(());
        }
        match (self, scalar) {
            (Self::Boolean(v), Scalar::Boolean(b)) => v.push(Some(b)),
            (Self::Byte(v), Scalar::Byte(n)) => v.push(Some(n)),
            (Self::Short(v), Scalar::Short(n)) => v.push(Some(n)),
            (Self::Integer(v), Scalar::Integer(n)) => v.push(Some(n)),
            (Self::Long(v), Scalar::Long(n)) => v.push(Some(n)),
            (Self::Float(v), Scalar::Float(n)) => v.push(Some(n)),
            (Self::Double(v), Scalar::Double(n)) => v.push(Some(n)),
            (Self::String(v), Scalar::String(s)) => v.push(Some(s)),
            (Self::Binary(v), Scalar::Binary(b)) => v.push(Some(b)),
            (Self::Decimal(_, v), Scalar::Decimal(d)) => v.push(Some(d.unscaled())),
            (Self::Date(v), Scalar::Date(d)) => v.push(Some(d)),
            (Self::Timestamp(v), Scalar::Timestamp(t)) => v.push(Some(t)),
            (Self::Array(v), Scalar::Array(a)) => v.push(Some(a)),
            (Self::Map(v), Scalar::Map(m)) => v.push(Some(m)),
            (Self::Struct(column), Scalar::Struct(value)) => {
                let values = value.values;
                if values.len() != column.columns.len() {
                    return Err(Error::internal_error(
                        "Struct scalar arity does not match its column",
                    ));
                }
                column.nulls.push(false);
                for (child, member) in column.columns.iter_mut().zip(values) {
                    if member.is_null() {
                        child.push_null();
                    } else {
                        child.push_scalar(member)?;
                    }
                }
            }
            (column, scalar) => {
                return Err(Error::internal_error(format!(
                    "Cannot store a {scalar:?} in a {} column",
                    column.type_name()
                )))
            }
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::Decimal(..) => "decimal",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Binary(v) => v.len(),
            Self::Decimal(_, v) => v.len(),
            Self::Date(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::Array(v) => v.len(),
            Self::Map(v) => v.len(),
            Self::Struct(column) => column.nulls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null_at(&self, row: usize) -> bool {
        match self {
            Self::Boolean(v) => v[row].is_none(),
            Self::Byte(v) => v[row].is_none(),
            Self::Short(v) => v[row].is_none(),
            Self::Integer(v) => v[row].is_none(),
            Self::Long(v) => v[row].is_none(),
            Self::Float(v) => v[row].is_none(),
            Self::Double(v) => v[row].is_none(),
            Self::String(v) => v[row].is_none(),
            Self::Binary(v) => v[row].is_none(),
            Self::Decimal(_, v) => v[row].is_none(),
            Self::Date(v) => v[row].is_none(),
            Self::Timestamp(v) => v[row].is_none(),
            Self::Array(v) => v[row].is_none(),
            Self::Map(v) => v[row].is_none(),
            Self::Struct(column) => column.nulls[row],
        }
    }

    copied_getter!(get_boolean, Boolean, bool);
    copied_getter!(get_byte, Byte, i8);
    copied_getter!(get_short, Short, i16);
    copied_getter!(get_integer, Integer, i32);
    copied_getter!(get_long, Long, i64);
    copied_getter!(get_float, Float, f32);
    copied_getter!(get_double, Double, f64);
    copied_getter!(
        /// Epoch day count.
        get_date,
        Date,
        i32
    );
    copied_getter!(
        /// Microseconds since the unix epoch, UTC.
        get_timestamp,
        Timestamp,
        i64
    );
    ref_getter!(get_string, String, String);
    ref_getter!(get_binary, Binary, Vec<u8>);
    ref_getter!(get_array, Array, ArrayValue);
    ref_getter!(get_map, Map, MapValue);

    /// Unscaled decimal value. The precision and scale are fixed per column.
    pub fn get_decimal(&self, row: usize) -> Option<i128> {
        match self {
            Self::Decimal(_, values) => values[row],
            other => panic!("get_decimal called on a {} column", other.type_name()),
        }
    }

    pub fn as_struct(&self) -> &StructColumn {
        match self {
            Self::Struct(column) => column,
            other => panic!("as_struct called on a {} column", other.type_name()),
        }
    }
}

/// N rows decoded against a schema, stored column-wise.
#[derive(Debug)]
pub struct ColumnarBatch {
    schema: StructType,
    columns: Vec<ColumnVector>,
    num_rows: usize,
}

impl ColumnarBatch {
    pub(crate) fn new(schema: StructType, columns: Vec<ColumnVector>, num_rows: usize) -> Self {
        Self {
            schema,
            columns,
            num_rows,
        }
    }

    pub fn schema(&self) -> &StructType {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> &ColumnVector {
        &self.columns[index]
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnVector> {
        let index = self.schema.index_of(name)?;
        Some(&self.columns[index])
    }
}
