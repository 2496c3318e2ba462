//! Record descriptors, type mapping, and SQL generation.
//!
//! This crate holds the engine-independent half of tabula:
//!
//! - [`Record`] and the [`record!`] macro: the declared shape of a storable
//!   type (fields, tags, and positional value exchange).
//! - [`engine_type`]: the mapping from a field's [`FieldType`] to a column
//!   type string.
//! - [`TableDescriptor`]: the validated table/column/index description
//!   extracted once per record type.
//! - [`QueryBuilder`]: parameterized SQL for DDL, CRUD, and filtered access.
//! - [`ColumnValue`] and [`Value`]: conversion of single fields to and from
//!   stored values.
//!
//! # Example
//!
//! ```
//! use tabula_core::*;
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Student {
//!         #[column = "id"]
//!         pub id: i64,
//!         #[column = "age"]
//!         #[index = "unique"]
//!         pub age: i64,
//!         #[column = "create_time"]
//!         pub create_time: i64,
//!     }
//! }
//!
//! let descriptor = TableDescriptor::of::<Student>().unwrap();
//! let builder = QueryBuilder::new(&descriptor);
//! assert_eq!(builder.select().sql, "select id,age,create_time from student");
//! assert_eq!(descriptor.indexes[0].canonical_name(), "student_age_idx");
//! ```

mod descriptor;
mod error;
mod naming;
mod query;
mod record;
mod types;
mod value;

pub use descriptor::{
    ColumnDescriptor, IndexDescriptor, TableDescriptor, is_primary_key_index, parse_index_tag,
    primary_key_index_name,
};
pub use error::{SchemaError, ValueError};
pub use naming::{is_identifier, is_snake_case, to_snake, to_table_name};
pub use query::{InsertStatement, QueryBuilder, Statement, normalize_where};
pub use record::{COLUMN_TAG, FieldDecl, ID_COLUMN, INDEX_TAG, Record};
pub use types::{FieldType, Kind, base_type, engine_type};
pub use value::{ColumnValue, Value, decode_next};
