//! Extraction of a record type's storage shape.
//!
//! [`TableDescriptor::of`] walks a [`Record`]'s declared fields once and
//! produces the ordered column list plus the declared indexes. The column
//! order fixed here is the only order used for DDL, bind lists, and row
//! decoding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::naming::{is_identifier, is_snake_case};
use crate::record::{FieldDecl, ID_COLUMN, Record};
use crate::types::{FieldType, Kind, base_type, engine_type};

/// A declared (local) column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, already snake case.
    pub name: String,
    /// Mapped engine type, including any default clause.
    pub engine_type: String,
    pub field_type: FieldType,
    /// Position of the source field in the record (the id field is 0).
    pub position: usize,
}

impl ColumnDescriptor {
    /// Validates the name and maps the field type.
    ///
    /// # Errors
    ///
    /// Fails if `name` is not snake case or not a plain identifier, or if
    /// the type has no mapping.
    pub fn new(
        field: &str,
        name: &str,
        field_type: FieldType,
        position: usize,
    ) -> Result<Self, SchemaError> {
        if !is_snake_case(name) {
            return Err(SchemaError::TagNotSnakeCase {
                field: field.to_string(),
                tag: name.to_string(),
            });
        }
        if !is_identifier(name) {
            return Err(SchemaError::InvalidIdentifier {
                field: field.to_string(),
                tag: name.to_string(),
            });
        }
        let engine_type = engine_type(field, &field_type)?;
        Ok(Self {
            name: name.to_string(),
            engine_type,
            field_type,
            position,
        })
    }

    /// The engine type without its constraint clause.
    pub fn base_type(&self) -> &str {
        base_type(&self.engine_type)
    }
}

/// A declared index on a single column.
///
/// Its identity is the [canonical name](IndexDescriptor::canonical_name),
/// not whatever identifier the engine assigns internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub table_name: String,
    pub column_name: String,
    pub is_unique: bool,
    /// Marks the implicit unique index backing the primary key.
    pub primary_key: bool,
}

impl IndexDescriptor {
    /// The implicit unique index on the primary key.
    pub fn primary_key(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: ID_COLUMN.to_string(),
            is_unique: true,
            primary_key: true,
        }
    }

    /// `<table>_<column>_idx`, or `<table>_id_pkey_idx` for the primary key.
    pub fn canonical_name(&self) -> String {
        if self.primary_key {
            primary_key_index_name(&self.table_name)
        } else {
            format!("{}_{}_idx", self.table_name, self.column_name)
        }
    }
}

/// Canonical name of the primary-key index for `table`.
pub fn primary_key_index_name(table: &str) -> String {
    format!("{table}_id_pkey_idx")
}

/// Returns `true` if `name` is exactly the primary-key index name of
/// `table`, ignoring ASCII case as the engine does for identifiers.
pub fn is_primary_key_index(table: &str, name: &str) -> bool {
    name.eq_ignore_ascii_case(&primary_key_index_name(table))
}

/// Parses an index tag into its uniqueness flag.
///
/// The tag is a comma-separated flag set; each entry is `key` or
/// `key=value` and only the key is significant. Empty entries are skipped.
///
/// # Errors
///
/// Returns [`SchemaError::UnsupportedIndexOption`] for any key other than
/// `unique` or `uniq`.
pub fn parse_index_tag(column: &str, tag: &str) -> Result<bool, SchemaError> {
    let mut unique = false;
    for entry in tag.split(',') {
        let key = entry.split('=').next().unwrap_or_default().trim();
        match key {
            "" => {}
            "unique" | "uniq" => unique = true,
            other => {
                return Err(SchemaError::UnsupportedIndexOption {
                    column: column.to_string(),
                    option: other.to_string(),
                });
            }
        }
    }
    Ok(unique)
}

/// The full storage shape of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub type_name: String,
    pub table_name: String,
    /// Non-id columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    /// Declared indexes in declaration order, excluding the primary key.
    pub indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    /// Extracts the descriptor of record type `R`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] describing the first malformed field.
    pub fn of<R: Record>() -> Result<Self, SchemaError> {
        Self::from_fields(R::TYPE_NAME, &R::table_name(), &R::fields())
    }

    /// Extracts a descriptor from an explicit field list.
    pub fn from_fields(
        type_name: &str,
        table_name: &str,
        fields: &[FieldDecl],
    ) -> Result<Self, SchemaError> {
        let (id, rest) = fields
            .split_first()
            .ok_or_else(|| SchemaError::NoFields(type_name.to_string()))?;

        let id_ok = id.column_tag() == Some(ID_COLUMN) && id.ty == FieldType::new(Kind::I64);
        if !id_ok {
            return Err(SchemaError::IdField {
                field: id.ident.to_string(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::from([ID_COLUMN]);
        let mut columns = Vec::with_capacity(rest.len());
        let mut indexes = Vec::new();

        for (offset, field) in rest.iter().enumerate() {
            let name = field.column_tag().ok_or_else(|| SchemaError::MissingColumnTag {
                field: field.ident.to_string(),
            })?;
            let column = ColumnDescriptor::new(field.ident, name, field.ty.clone(), offset + 1)?;
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateColumn(name.to_string()));
            }

            if let Some(tag) = field.index_tag() {
                let is_unique = parse_index_tag(name, tag)?;
                indexes.push(IndexDescriptor {
                    table_name: table_name.to_string(),
                    column_name: name.to_string(),
                    is_unique,
                    primary_key: false,
                });
            }
            columns.push(column);
        }

        Ok(Self {
            type_name: type_name.to_string(),
            table_name: table_name.to_string(),
            columns,
            indexes,
        })
    }

    /// The implicit primary-key index of this table.
    pub fn primary_key_index(&self) -> IndexDescriptor {
        IndexDescriptor::primary_key(&self.table_name)
    }

    /// Width of a selected row: the id plus every declared column.
    pub fn row_width(&self) -> usize {
        self.columns.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> FieldDecl {
        FieldDecl::new("id", FieldType::new(Kind::I64), &[("column", "id")])
    }

    fn extract(fields: &[FieldDecl]) -> Result<TableDescriptor, SchemaError> {
        TableDescriptor::from_fields("Student", "student", fields)
    }

    #[test]
    fn test_extracts_columns_and_indexes() {
        let desc = extract(&[
            id(),
            FieldDecl::new(
                "age",
                FieldType::new(Kind::I64),
                &[("column", "age"), ("index", "unique")],
            ),
            FieldDecl::new(
                "update_time",
                FieldType::new(Kind::I64),
                &[("column", "update_time"), ("index", "")],
            ),
            FieldDecl::new(
                "nickname",
                FieldType::new(Kind::Text).nullable(),
                &[("column", "nickname")],
            ),
        ])
        .unwrap();

        let names: Vec<_> = desc.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["age", "update_time", "nickname"]);
        assert_eq!(desc.columns[0].position, 1);
        assert_eq!(desc.columns[2].engine_type, "text");
        assert_eq!(desc.row_width(), 4);

        assert_eq!(desc.indexes.len(), 2);
        assert_eq!(desc.indexes[0].canonical_name(), "student_age_idx");
        assert!(desc.indexes[0].is_unique);
        assert_eq!(desc.indexes[1].canonical_name(), "student_update_time_idx");
        assert!(!desc.indexes[1].is_unique);
    }

    #[test]
    fn test_first_field_must_be_id() {
        let err = extract(&[FieldDecl::new(
            "age",
            FieldType::new(Kind::I64),
            &[("column", "age")],
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::IdField { .. }));

        let err = extract(&[FieldDecl::new(
            "id",
            FieldType::new(Kind::I32),
            &[("column", "id")],
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::IdField { .. }));

        let err = extract(&[FieldDecl::new(
            "id",
            FieldType::new(Kind::I64).nullable(),
            &[("column", "id")],
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::IdField { .. }));
    }

    #[test]
    fn test_empty_record_rejected() {
        assert_eq!(
            extract(&[]).unwrap_err(),
            SchemaError::NoFields("Student".to_string())
        );
    }

    #[test]
    fn test_missing_column_tag() {
        let err = extract(&[
            id(),
            FieldDecl::new("age", FieldType::new(Kind::I64), &[("index", "")]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumnTag {
                field: "age".to_string()
            }
        );
    }

    #[test]
    fn test_camel_case_tag_is_rejected_not_renamed() {
        let err = extract(&[
            id(),
            FieldDecl::new(
                "update_time",
                FieldType::new(Kind::I64),
                &[("column", "updateTime")],
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::TagNotSnakeCase { ref tag, .. } if tag == "updateTime"));
    }

    #[test]
    fn test_duplicate_columns_fail() {
        let err = extract(&[
            id(),
            FieldDecl::new("a", FieldType::new(Kind::I64), &[("column", "age")]),
            FieldDecl::new("b", FieldType::new(Kind::I32), &[("column", "age")]),
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("age".to_string()));

        let err = extract(&[
            id(),
            FieldDecl::new("other_id", FieldType::new(Kind::I64), &[("column", "id")]),
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("id".to_string()));
    }

    #[test]
    fn test_unsupported_type_fails() {
        let err = extract(&[
            id(),
            FieldDecl::new(
                "tags",
                FieldType::unsupported("Vec<String>"),
                &[("column", "tags")],
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedType { .. }));
    }

    #[test]
    fn test_index_tag_parsing() {
        assert!(!parse_index_tag("c", "").unwrap());
        assert!(parse_index_tag("c", "unique").unwrap());
        assert!(parse_index_tag("c", "uniq").unwrap());
        assert!(parse_index_tag("c", " unique , ").unwrap());
        assert!(parse_index_tag("c", "unique=1").unwrap());
        let err = parse_index_tag("c", "unique,btree").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedIndexOption {
                column: "c".to_string(),
                option: "btree".to_string()
            }
        );
    }

    #[test]
    fn test_primary_key_index_identity() {
        let pk = IndexDescriptor::primary_key("student");
        assert_eq!(pk.canonical_name(), "student_id_pkey_idx");
        assert!(is_primary_key_index("student", "student_id_pkey_idx"));
        assert!(!is_primary_key_index("student", "student_id_pkey_idx_old"));
        assert!(!is_primary_key_index("student", "other_id_pkey_idx"));
        assert!(is_primary_key_index("student", "STUDENT_ID_PKEY_IDX"));
    }

    #[test]
    fn test_descriptor_serializes() {
        let desc = extract(&[id()]).unwrap();
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["table_name"], "student");
        assert_eq!(json["columns"].as_array().unwrap().len(), 0);
    }
}
