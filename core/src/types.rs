//! Semantic field types and their engine column types.
//!
//! [`engine_type`] is the single place where a field's Rust-side type turns
//! into a column type string. It is deterministic: reconciliation compares
//! the base token of its output against what the engine reports, so the
//! same input must always produce the same string.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The storage-relevant kind of a record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// UTF-8 text (`String`).
    Text,
    Bool,
    /// Byte sequence (`Vec<u8>`).
    Bytes,
    /// A type with no column mapping, carrying its Rust type name.
    Unsupported(String),
}

impl Kind {
    /// The bare engine type name, or `None` for unsupported kinds.
    pub fn type_name(&self) -> Option<&'static str> {
        let name = match self {
            Kind::I8 => "int8",
            Kind::I16 => "int16",
            Kind::I32 => "int32",
            Kind::I64 => "int64",
            Kind::U8 => "uint8",
            Kind::U16 => "uint16",
            Kind::U32 => "uint32",
            Kind::U64 => "uint64",
            Kind::F32 => "float32",
            Kind::F64 => "float64",
            Kind::Text => "text",
            Kind::Bool => "bool",
            Kind::Bytes => "blob",
            Kind::Unsupported(_) => return None,
        };
        Some(name)
    }

    /// Returns `true` for integer and floating point kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Kind::I8
                | Kind::I16
                | Kind::I32
                | Kind::I64
                | Kind::U8
                | Kind::U16
                | Kind::U32
                | Kind::U64
                | Kind::F32
                | Kind::F64
        )
    }

    /// Human-readable kind name, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Kind::Unsupported(name) => name.clone(),
            other => other.type_name().unwrap_or_default().to_string(),
        }
    }
}

/// A field's kind plus whether it may hold null (`Option<T>`).
///
/// # Examples
///
/// ```
/// use tabula_core::{FieldType, Kind};
///
/// let age = FieldType::new(Kind::I64);
/// assert!(!age.nullable);
/// assert!(age.clone().nullable().nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub kind: Kind,
    pub nullable: bool,
}

impl FieldType {
    /// A non-nullable field of the given kind.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// A field type with no column mapping.
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Self::new(Kind::Unsupported(type_name.into()))
    }

    /// Marks the field as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Maps a field type to its engine column type, including the default
/// clause for non-nullable fields.
///
/// | kind | non-nullable | nullable |
/// |---|---|---|
/// | integers, floats | `int64 not null default 0` | `int64` |
/// | text | `text not null default ''` | `text` |
/// | bool | `bool not null default false` | `bool` |
/// | bytes | `blob` | `blob` |
///
/// # Errors
///
/// Returns [`SchemaError::UnsupportedType`] for [`Kind::Unsupported`].
///
/// # Examples
///
/// ```
/// use tabula_core::{engine_type, FieldType, Kind};
///
/// let ty = engine_type("age", &FieldType::new(Kind::I32)).unwrap();
/// assert_eq!(ty, "int32 not null default 0");
/// let ty = engine_type("nick", &FieldType::new(Kind::Text).nullable()).unwrap();
/// assert_eq!(ty, "text");
/// ```
pub fn engine_type(field: &str, ty: &FieldType) -> Result<String, SchemaError> {
    let name = ty.kind.type_name().ok_or_else(|| SchemaError::UnsupportedType {
        field: field.to_string(),
        kind: ty.kind.describe(),
    })?;

    if ty.nullable {
        return Ok(name.to_string());
    }

    let mapped = match ty.kind {
        Kind::Text => format!("{name} not null default ''"),
        Kind::Bool => format!("{name} not null default false"),
        Kind::Bytes => name.to_string(),
        _ => format!("{name} not null default 0"),
    };
    Ok(mapped)
}

/// The type token of a mapped column type, without constraints.
pub fn base_type(engine_type: &str) -> &str {
    engine_type.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_kinds() {
        let cases = [
            (Kind::I8, "int8"),
            (Kind::I16, "int16"),
            (Kind::I32, "int32"),
            (Kind::I64, "int64"),
            (Kind::U8, "uint8"),
            (Kind::U64, "uint64"),
            (Kind::F32, "float32"),
            (Kind::F64, "float64"),
        ];
        for (kind, name) in cases {
            assert!(kind.is_numeric());
            let ty = FieldType::new(kind);
            assert_eq!(
                engine_type("n", &ty).unwrap(),
                format!("{name} not null default 0")
            );
            assert_eq!(engine_type("n", &ty.nullable()).unwrap(), name);
        }
    }

    #[test]
    fn test_text_bool_blob() {
        let text = FieldType::new(Kind::Text);
        assert_eq!(engine_type("t", &text).unwrap(), "text not null default ''");
        assert_eq!(engine_type("t", &text.nullable()).unwrap(), "text");

        let flag = FieldType::new(Kind::Bool);
        assert_eq!(
            engine_type("b", &flag).unwrap(),
            "bool not null default false"
        );
        assert_eq!(engine_type("b", &flag.nullable()).unwrap(), "bool");

        let bytes = FieldType::new(Kind::Bytes);
        assert_eq!(engine_type("d", &bytes).unwrap(), "blob");
        assert_eq!(engine_type("d", &bytes.nullable()).unwrap(), "blob");
    }

    #[test]
    fn test_unsupported_names_field_and_kind() {
        let err = engine_type("tags", &FieldType::unsupported("Vec<String>")).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedType {
                field: "tags".to_string(),
                kind: "Vec<String>".to_string(),
            }
        );
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let ty = FieldType::new(Kind::U32);
        assert_eq!(engine_type("a", &ty), engine_type("a", &ty));
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("int64 not null default 0"), "int64");
        assert_eq!(base_type("text"), "text");
        assert_eq!(base_type(""), "");
    }
}
