//! SQLite-backed record models with automatic schema reconciliation.
//!
//! A record type declared with [`record!`] becomes a [`Model`]: opening the
//! model creates the table if needed, adds declared columns that are
//! missing, drops columns and indexes the record no longer declares, and
//! refuses to touch a table whose shared columns or indexes have drifted.
//! After that the model offers positional CRUD over the table.
//!
//! # Architecture
//!
//! - **`config`**: [`Locator`] parsing and connection setup
//! - **`schema`**: catalog reads and the pure reconciliation [`plan`]
//! - **`migration`**: applying a plan, reporting through [`EventSink`]
//! - **`convert`**: record values to and from engine rows
//! - **`model`**: the [`Model`] CRUD surface
//!
//! # Quick start
//!
//! ```
//! use tabula_sqlite::{Model, SchemaChange, record};
//!
//! record! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct User {
//!         #[column = "id"]
//!         pub id: i64,
//!         #[column = "email"]
//!         #[index = "unique"]
//!         pub email: String,
//!         #[column = "active"]
//!         pub active: bool,
//!     }
//! }
//!
//! let mut events: Vec<SchemaChange> = Vec::new();
//! let users = Model::<User>::open_with_sink(":memory:", &mut events).unwrap();
//! assert_eq!(users.table_name(), "users");
//! assert_eq!(events.len(), 3);
//!
//! users
//!     .insert(&User { id: 0, email: "a@example.com".into(), active: true })
//!     .unwrap();
//! assert!(users.exists_where("email = ?1", ["a@example.com"]).unwrap());
//! ```

mod config;
mod convert;
mod error;
mod migration;
mod model;
mod schema;

pub use config::Locator;
pub use error::{ModelError, Result};
pub use migration::{EventSink, change_statement, reconcile};
pub use model::Model;
pub use schema::{
    RemoteColumn, RemoteIndex, SchemaChange, SchemaPlan, describe_table, list_indexes, plan,
};

pub use tabula_core::{
    ColumnDescriptor, ColumnValue, FieldType, IndexDescriptor, Kind, QueryBuilder, Record,
    SchemaError, Statement, TableDescriptor, Value, ValueError, record,
};
