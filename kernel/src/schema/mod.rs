//! Schema definitions for tablelog tables.
//!
//! A table schema is a [`StructType`]: an ordered list of named, typed,
//! possibly-nested fields. Schemas serialize to a canonical JSON form (the
//! `schemaString` carried by `metaData` actions) and deserialize back
//! losslessly, including field metadata and arbitrary nesting of arrays,
//! maps, and structs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{Error, TableResult};
use crate::utils::require;

pub type SchemaRef = Arc<StructType>;

/// Largest decimal precision a column may declare.
pub const DECIMAL_MAX_PRECISION: u8 = 38;

/// Precision and scale of a decimal type. Precision is the total number of
/// digits, scale the number of digits after the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalType {
    precision: u8,
    scale: u8,
}

impl DecimalType {
    pub fn try_new(precision: u8, scale: u8) -> TableResult<Self> {
        require!(
            (1..=DECIMAL_MAX_PRECISION).contains(&precision),
            Error::schema(format!(
                "Decimal precision must be in [1, {DECIMAL_MAX_PRECISION}], got {precision}"
            ))
        );
        require!(
            scale <= precision,
            Error::schema(format!(
                "Decimal scale {scale} exceeds precision {precision}"
            ))
        );
        Ok(Self { precision, scale })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }
}

impl fmt::Display for DecimalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decimal({},{})", self.precision, self.scale)
    }
}

/// Non-nested data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Binary,
    Date,
    Timestamp,
    Decimal(DecimalType),
}

impl PrimitiveType {
    /// Parses the canonical name, e.g. `"long"` or `"decimal(10,2)"`.
    fn parse(name: &str) -> TableResult<Self> {
        let primitive = match name {
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "string" => Self::String,
            "binary" => Self::Binary,
            "date" => Self::Date,
            "timestamp" => Self::Timestamp,
            _ => return Self::parse_decimal(name),
        };
        Ok(primitive)
    }

    fn parse_decimal(name: &str) -> TableResult<Self> {
        let args = name
            .strip_prefix("decimal(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| Error::schema(format!("Unknown primitive type {name}")))?;
        let (precision, scale) = args
            .split_once(',')
            .ok_or_else(|| Error::schema(format!("Malformed decimal type {name}")))?;
        let precision = precision
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::schema(format!("Malformed decimal precision in {name}")))?;
        let scale = scale
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::schema(format!("Malformed decimal scale in {name}")))?;
        Ok(Self::Decimal(DecimalType::try_new(precision, scale)?))
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Byte => write!(f, "byte"),
            Self::Short => write!(f, "short"),
            Self::Integer => write!(f, "integer"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::Binary => write!(f, "binary"),
            Self::Date => write!(f, "date"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Decimal(decimal) => write!(f, "{decimal}"),
        }
    }
}

/// An array of values sharing a single element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    element_type: DataType,
    contains_null: bool,
}

impl ArrayType {
    pub fn new(element_type: DataType, contains_null: bool) -> Self {
        Self {
            element_type,
            contains_null,
        }
    }

    pub fn element_type(&self) -> &DataType {
        &self.element_type
    }

    pub fn contains_null(&self) -> bool {
        self.contains_null
    }
}

/// A map with homogeneous key and value types.
#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    key_type: DataType,
    value_type: DataType,
    value_contains_null: bool,
}

impl MapType {
    pub fn new(key_type: DataType, value_type: DataType, value_contains_null: bool) -> Self {
        Self {
            key_type,
            value_type,
            value_contains_null,
        }
    }

    pub fn key_type(&self) -> &DataType {
        &self.key_type
    }

    pub fn value_type(&self) -> &DataType {
        &self.value_type
    }

    pub fn value_contains_null(&self) -> bool {
        self.value_contains_null
    }
}

/// Any type a column (or nested component) may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Primitive(PrimitiveType),
    Array(Box<ArrayType>),
    Map(Box<MapType>),
    Struct(Box<StructType>),
}

impl DataType {
    pub const BOOLEAN: DataType = DataType::Primitive(PrimitiveType::Boolean);
    pub const BYTE: DataType = DataType::Primitive(PrimitiveType::Byte);
    pub const SHORT: DataType = DataType::Primitive(PrimitiveType::Short);
    pub const INTEGER: DataType = DataType::Primitive(PrimitiveType::Integer);
    pub const LONG: DataType = DataType::Primitive(PrimitiveType::Long);
    pub const FLOAT: DataType = DataType::Primitive(PrimitiveType::Float);
    pub const DOUBLE: DataType = DataType::Primitive(PrimitiveType::Double);
    pub const STRING: DataType = DataType::Primitive(PrimitiveType::String);
    pub const BINARY: DataType = DataType::Primitive(PrimitiveType::Binary);
    pub const DATE: DataType = DataType::Primitive(PrimitiveType::Date);
    pub const TIMESTAMP: DataType = DataType::Primitive(PrimitiveType::Timestamp);

    pub fn decimal(precision: u8, scale: u8) -> TableResult<Self> {
        Ok(Self::Primitive(PrimitiveType::Decimal(DecimalType::try_new(
            precision, scale,
        )?)))
    }

    pub fn array(element_type: DataType, contains_null: bool) -> Self {
        Self::Array(Box::new(ArrayType::new(element_type, contains_null)))
    }

    pub fn map(key_type: DataType, value_type: DataType, value_contains_null: bool) -> Self {
        Self::Map(Box::new(MapType::new(
            key_type,
            value_type,
            value_contains_null,
        )))
    }

    pub fn struct_type(fields: impl IntoIterator<Item = StructField>) -> TableResult<Self> {
        Ok(Self::Struct(Box::new(StructType::try_new(fields)?)))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => write!(f, "{primitive}"),
            Self::Array(array) => write!(f, "array<{}>", array.element_type()),
            Self::Map(map) => write!(f, "map<{}, {}>", map.key_type(), map.value_type()),
            Self::Struct(_) => write!(f, "struct"),
        }
    }
}

/// A single value in a field's metadata map.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

/// One named field of a struct.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    name: String,
    data_type: DataType,
    nullable: bool,
    metadata: HashMap<String, MetadataValue>,
}

impl StructField {
    /// A new field that may hold nulls.
    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            metadata: HashMap::new(),
        }
    }

    /// A new field that must not hold nulls.
    pub fn not_null(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(
        mut self,
        metadata: impl IntoIterator<Item = (impl Into<String>, MetadataValue)>,
    ) -> Self {
        self.metadata
            .extend(metadata.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn metadata(&self) -> &HashMap<String, MetadataValue> {
        &self.metadata
    }

    /// Copy of this field with the given metadata keys removed, recursively
    /// through nested struct types.
    pub(crate) fn without_metadata_keys(&self, keys: &[&str]) -> StructField {
        let mut metadata = self.metadata.clone();
        for key in keys {
            metadata.remove(*key);
        }
        StructField {
            name: self.name.clone(),
            data_type: strip_metadata_keys(&self.data_type, keys),
            nullable: self.nullable,
            metadata,
        }
    }
}

fn strip_metadata_keys(data_type: &DataType, keys: &[&str]) -> DataType {
    match data_type {
        DataType::Struct(inner) => DataType::Struct(Box::new(StructType::new_unchecked(
            inner.fields().map(|f| f.without_metadata_keys(keys)),
        ))),
        DataType::Array(inner) => DataType::array(
            strip_metadata_keys(inner.element_type(), keys),
            inner.contains_null(),
        ),
        DataType::Map(inner) => DataType::map(
            strip_metadata_keys(inner.key_type(), keys),
            strip_metadata_keys(inner.value_type(), keys),
            inner.value_contains_null(),
        ),
        primitive => primitive.clone(),
    }
}

/// An ordered collection of named fields. The root type of every table
/// schema.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    fields: Vec<StructField>,
}

impl StructType {
    /// Builds a struct type, enforcing that field names are unique at this
    /// nesting level.
    pub fn try_new(fields: impl IntoIterator<Item = StructField>) -> TableResult<Self> {
        let fields: Vec<_> = fields.into_iter().collect();
        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            require!(
                seen.insert(field.name()),
                Error::schema(format!("Duplicate field name {}", field.name()))
            );
        }
        Ok(Self { fields })
    }

    /// Builds a struct type without the duplicate-name check. Callers must
    /// guarantee uniqueness.
    pub fn new_unchecked(fields: impl IntoIterator<Item = StructField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &StructField> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serializes to the canonical schema JSON text.
    pub fn to_json(&self) -> TableResult<String> {
        Ok(serde_json::to_string(&struct_to_value(self))?)
    }

    /// Parses schema JSON text. Fails with [`Error::MalformedJson`] when the
    /// text is not valid JSON and with [`Error::Schema`] when the JSON parses
    /// but does not denote a struct type.
    pub fn try_from_json(text: &str) -> TableResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        match data_type_from_value(&value)? {
            DataType::Struct(parsed) => Ok(*parsed),
            other => Err(Error::schema(format!(
                "Expected a struct type, got {other}"
            ))),
        }
    }
}

// The canonical JSON encoding: primitives as their name string, nested types
// as tagged objects, fields as {name, type, nullable, metadata}.

fn metadata_value_to_value(value: &MetadataValue) -> Value {
    match value {
        MetadataValue::Null => Value::Null,
        MetadataValue::Boolean(b) => Value::from(*b),
        MetadataValue::Long(n) => Value::from(*n),
        MetadataValue::Double(n) => Value::from(*n),
        MetadataValue::String(s) => Value::from(s.clone()),
    }
}

fn field_to_value(field: &StructField) -> Value {
    let metadata: Map<String, Value> = field
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), metadata_value_to_value(v)))
        .collect();
    json!({
        "name": field.name,
        "type": data_type_to_value(&field.data_type),
        "nullable": field.nullable,
        "metadata": metadata,
    })
}

fn struct_to_value(schema: &StructType) -> Value {
    json!({
        "type": "struct",
        "fields": schema.fields.iter().map(field_to_value).collect::<Vec<_>>(),
    })
}

fn data_type_to_value(data_type: &DataType) -> Value {
    match data_type {
        DataType::Primitive(primitive) => Value::from(primitive.to_string()),
        DataType::Array(array) => json!({
            "type": "array",
            "elementType": data_type_to_value(array.element_type()),
            "containsNull": array.contains_null(),
        }),
        DataType::Map(map) => json!({
            "type": "map",
            "keyType": data_type_to_value(map.key_type()),
            "valueType": data_type_to_value(map.value_type()),
            "valueContainsNull": map.value_contains_null(),
        }),
        DataType::Struct(inner) => struct_to_value(inner),
    }
}

fn metadata_value_from_value(value: &Value) -> TableResult<MetadataValue> {
    match value {
        Value::Null => Ok(MetadataValue::Null),
        Value::Bool(b) => Ok(MetadataValue::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(MetadataValue::Long)
            .or_else(|| n.as_f64().map(MetadataValue::Double))
            .ok_or_else(|| Error::schema(format!("Unrepresentable metadata number {n}"))),
        Value::String(s) => Ok(MetadataValue::String(s.clone())),
        other => Err(Error::schema(format!(
            "Field metadata values must be null, boolean, number, or string, got {other}"
        ))),
    }
}

fn field_from_value(value: &Value) -> TableResult<StructField> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::schema(format!("Expected a field object, got {value}")))?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::schema("Field is missing a string 'name'"))?;
    let data_type = object
        .get("type")
        .ok_or_else(|| Error::schema(format!("Field {name} is missing 'type'")))?;
    let nullable = match object.get("nullable") {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(Error::schema(format!(
                "Field {name} has non-boolean 'nullable': {other}"
            )))
        }
    };
    let mut metadata = HashMap::new();
    if let Some(raw) = object.get("metadata") {
        let raw = raw
            .as_object()
            .ok_or_else(|| Error::schema(format!("Field {name} has non-object 'metadata'")))?;
        for (key, entry) in raw {
            metadata.insert(key.clone(), metadata_value_from_value(entry)?);
        }
    }
    Ok(StructField {
        name: name.to_string(),
        data_type: data_type_from_value(data_type)?,
        nullable,
        metadata,
    })
}

fn data_type_from_value(value: &Value) -> TableResult<DataType> {
    match value {
        Value::String(name) => Ok(DataType::Primitive(PrimitiveType::parse(name)?)),
        Value::Object(object) => {
            let tag = object
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::schema("Type object is missing a string 'type' tag"))?;
            match tag {
                "struct" => {
                    let fields = object
                        .get("fields")
                        .and_then(Value::as_array)
                        .ok_or_else(|| Error::schema("Struct type is missing 'fields'"))?;
                    let fields = fields
                        .iter()
                        .map(field_from_value)
                        .collect::<TableResult<Vec<_>>>()?;
                    Ok(DataType::Struct(Box::new(StructType::try_new(fields)?)))
                }
                "array" => {
                    let element_type = object
                        .get("elementType")
                        .ok_or_else(|| Error::schema("Array type is missing 'elementType'"))?;
                    let contains_null = object
                        .get("containsNull")
                        .and_then(Value::as_bool)
                        .unwrap_or(true);
                    Ok(DataType::array(
                        data_type_from_value(element_type)?,
                        contains_null,
                    ))
                }
                "map" => {
                    let key_type = object
                        .get("keyType")
                        .ok_or_else(|| Error::schema("Map type is missing 'keyType'"))?;
                    let value_type = object
                        .get("valueType")
                        .ok_or_else(|| Error::schema("Map type is missing 'valueType'"))?;
                    let value_contains_null = object
                        .get("valueContainsNull")
                        .and_then(Value::as_bool)
                        .unwrap_or(true);
                    Ok(DataType::map(
                        data_type_from_value(key_type)?,
                        data_type_from_value(value_type)?,
                        value_contains_null,
                    ))
                }
                other => Err(Error::schema(format!("Unknown complex type tag {other}"))),
            }
        }
        other => Err(Error::schema(format!(
            "A type must be a name string or a tagged object, got {other}"
        ))),
    }
}

impl Serialize for StructType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct_to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StructType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match data_type_from_value(&value).map_err(D::Error::custom)? {
            DataType::Struct(parsed) => Ok(*parsed),
            other => Err(D::Error::custom(format!(
                "expected a struct type, got {other}"
            ))),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        data_type_to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        data_type_from_value(&value).map_err(D::Error::custom)
    }
}
