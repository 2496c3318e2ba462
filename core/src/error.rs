//! Error types for record declarations and value conversion.
//!
//! [`SchemaError`] covers everything that can be wrong with a record's
//! declared shape; it is raised while a
//! [`TableDescriptor`](crate::TableDescriptor) is being extracted and is
//! never auto-corrected. [`ValueError`] covers moving a single field value
//! between a record and its storage representation.

use thiserror::Error;

/// Malformed record declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The record has no fields at all.
    #[error("record {0} declares no fields")]
    NoFields(String),

    /// The first field is not tagged `id` or is not a non-nullable `i64`.
    #[error("first field must be id:int64, found field '{field}'")]
    IdField { field: String },

    /// A non-id field carries no `column` tag.
    #[error("field '{field}' is missing its column tag")]
    MissingColumnTag { field: String },

    /// The column tag changes when converted to snake case.
    #[error("field '{field}': column tag '{tag}' is not snake_case")]
    TagNotSnakeCase { field: String, tag: String },

    /// The column tag is snake case but not a plain SQL identifier.
    #[error("field '{field}': column tag '{tag}' is not a valid identifier")]
    InvalidIdentifier { field: String, tag: String },

    /// An index tag contains a flag other than `unique`/`uniq`.
    #[error("column '{column}': unsupported index option '{option}'")]
    UnsupportedIndexOption { column: String, option: String },

    /// Two fields map to the same column name.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// The field's type has no column mapping.
    #[error("field '{field}': unsupported field type (kind={kind})")]
    UnsupportedType { field: String, kind: String },
}

/// Failures converting between field values and stored values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// The stored value has the wrong storage class for the field.
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The value does not fit in the target type.
    #[error("{value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    /// A row ran out of values before every field was populated.
    #[error("row has no value for field '{0}'")]
    MissingValue(&'static str),

    /// Conversion of a named field failed.
    #[error("field '{field}': {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<ValueError>,
    },
}

impl ValueError {
    /// Attaches the field name to a conversion error.
    pub fn in_field(self, field: &'static str) -> Self {
        match self {
            already @ ValueError::Field { .. } => already,
            other => ValueError::Field {
                field,
                source: Box::new(other),
            },
        }
    }
}
