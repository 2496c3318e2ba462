//! Stored values and per-field conversions.
//!
//! [`Value`] mirrors the storage classes of the engine. [`ColumnValue`] is
//! implemented for every Rust type a record field may have; it supplies the
//! field's [`FieldType`] and converts in both directions.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::{FieldType, Kind};

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Storage class name, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::Mismatch {
            expected,
            found: self.type_name(),
        }
    }
}

/// A Rust type that can be stored in a single column.
pub trait ColumnValue: Sized {
    /// The semantic type used to derive the column type.
    fn field_type() -> FieldType;

    /// Converts the field into its stored form.
    fn to_value(&self) -> Result<Value, ValueError>;

    /// Rebuilds the field from its stored form.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_column_value_int {
    ( $( $ty:ty => $kind:ident ),* $(,)? ) => {
        $(
            impl ColumnValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::new(Kind::$kind)
                }

                fn to_value(&self) -> Result<Value, ValueError> {
                    i64::try_from(*self)
                        .map(Value::Integer)
                        .map_err(|_| ValueError::OutOfRange {
                            value: self.to_string(),
                            target: "int64",
                        })
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Integer(i) => <$ty>::try_from(i).map_err(|_| ValueError::OutOfRange {
                            value: i.to_string(),
                            target: stringify!($ty),
                        }),
                        other => Err(other.mismatch("integer")),
                    }
                }
            }
        )*
    };
}

impl_column_value_int! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

macro_rules! impl_column_value_float {
    ( $( $ty:ty => $kind:ident ),* $(,)? ) => {
        $(
            impl ColumnValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::new(Kind::$kind)
                }

                fn to_value(&self) -> Result<Value, ValueError> {
                    Ok(Value::Real(f64::from(*self)))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Real(f) => Ok(f as $ty),
                        // integral reals may come back as integers
                        Value::Integer(i) => Ok(i as $ty),
                        other => Err(other.mismatch("real")),
                    }
                }
            }
        )*
    };
}

impl_column_value_float! {
    f32 => F32,
    f64 => F64,
}

impl ColumnValue for String {
    fn field_type() -> FieldType {
        FieldType::new(Kind::Text)
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl ColumnValue for bool {
    fn field_type() -> FieldType {
        FieldType::new(Kind::Bool)
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Integer(i64::from(*self)))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl ColumnValue for Vec<u8> {
    fn field_type() -> FieldType {
        FieldType::new(Kind::Bytes)
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Blob(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Blob(b) => Ok(b),
            // blob columns carry no default, so rows older than the column are null
            Value::Null => Ok(Vec::new()),
            other => Err(other.mismatch("blob")),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn field_type() -> FieldType {
        T::field_type().nullable()
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Pulls the next value of a row and converts it into a field.
///
/// Used by [`record!`](crate::record) when rebuilding a record positionally.
pub fn decode_next<T, I>(values: &mut I, field: &'static str) -> Result<T, ValueError>
where
    T: ColumnValue,
    I: Iterator<Item = Value>,
{
    let value = values.next().ok_or(ValueError::MissingValue(field))?;
    T::from_value(value).map_err(|e| e.in_field(field))
}
