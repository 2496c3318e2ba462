//! Reconciled, ready-to-query table models.
//!
//! A [`Model`] binds one record type to one table on one connection.
//! Construction extracts the record's [`TableDescriptor`], reconciles the
//! live schema against it, and keeps the descriptor for every later call.
//! CRUD methods render their SQL through [`QueryBuilder`] and bind values
//! positionally.
//!
//! # Example
//!
//! ```
//! use tabula_sqlite::{Model, record};
//!
//! record! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Student {
//!         #[column = "id"]
//!         pub id: i64,
//!         #[column = "name"]
//!         pub name: String,
//!         #[column = "age"]
//!         #[index = ""]
//!         pub age: i64,
//!     }
//! }
//!
//! let model = Model::<Student>::open(":memory:").unwrap();
//! assert!(model.created());
//!
//! let id = model
//!     .insert(&Student { id: 0, name: "ada".into(), age: 36 })
//!     .unwrap();
//! let found = model.find(id).unwrap();
//! assert_eq!(found.name, "ada");
//!
//! let adults = model.query_where("age >= ?1", [18]).unwrap();
//! assert_eq!(adults.len(), 1);
//! ```

use std::any::Any;
use std::marker::PhantomData;

use rusqlite::{Connection, OptionalExtension, Params, params, params_from_iter};
use tabula_core::{QueryBuilder, Record, Statement, TableDescriptor};
use tracing::debug;

use crate::config::{Locator, configure};
use crate::convert;
use crate::error::{ModelError, Result};
use crate::migration::{EventSink, reconcile};

/// A record type bound to its reconciled table.
///
/// # Destructive reconciliation
///
/// Opening a model converges the table to the record declaration. Columns
/// and indexes that exist in the database but not in the record are
/// dropped, along with their data. Type or uniqueness drift on a shared
/// column or index is refused instead, and the model is not constructed.
pub struct Model<T: Record> {
    conn: Connection,
    descriptor: TableDescriptor,
    created: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Model<T> {
    /// Opens the database at `locator` and reconciles the record's table.
    ///
    /// # Errors
    ///
    /// Fails on a malformed record declaration, an unopenable database,
    /// schema drift, or an engine error while applying DDL.
    pub fn open(locator: impl Into<Locator>) -> Result<Self> {
        Self::open_with_sink(locator, &mut ())
    }

    /// Like [`open`](Self::open), reporting each applied schema change to
    /// `sink`.
    pub fn open_with_sink(locator: impl Into<Locator>, sink: &mut dyn EventSink) -> Result<Self> {
        let conn = locator.into().open()?;
        Self::reconciled(conn, sink)
    }

    /// Reconciles over an existing connection.
    ///
    /// The connection is configured like one opened from a [`Locator`].
    pub fn from_connection(conn: Connection, sink: &mut dyn EventSink) -> Result<Self> {
        configure(&conn)?;
        Self::reconciled(conn, sink)
    }

    fn reconciled(conn: Connection, sink: &mut dyn EventSink) -> Result<Self> {
        let descriptor = TableDescriptor::of::<T>()?;
        let plan = reconcile(&conn, &descriptor, sink)?;
        Ok(Self {
            conn,
            descriptor,
            created: plan.creates_table,
            _record: PhantomData,
        })
    }

    /// Whether opening this model created its table.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    pub fn table_name(&self) -> &str {
        &self.descriptor.table_name
    }

    /// The SQL generator for this model's table.
    pub fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.descriptor)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Inserts `record` and returns the id the engine assigned.
    ///
    /// The record's own id field is not written.
    pub fn insert(&self, record: &T) -> Result<i64> {
        let insert = self.queries().insert();
        let values = convert::bind_values(record, &insert.bind_positions)?;
        self.execute(&insert.statement, params_from_iter(values))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Inserts records one by one, each in its own transaction.
    ///
    /// A failure on one record leaves the records before it committed.
    pub fn insert_all(&self, records: &[T]) -> Result<Vec<i64>> {
        records.iter().map(|record| self.insert(record)).collect()
    }

    /// Loads the row with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if no row has that id.
    pub fn find(&self, id: i64) -> Result<T> {
        let statement = self.queries().find();
        self.query_one(&statement, params![id])
    }

    /// Loads the first row matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if nothing matches.
    pub fn find_where<P: Params>(&self, predicate: &str, params: P) -> Result<T> {
        let statement = self.queries().select_where(predicate);
        self.query_one(&statement, params)
    }

    /// Loads every row matching `predicate`; an empty predicate loads all.
    pub fn query_where<P: Params>(&self, predicate: &str, params: P) -> Result<Vec<T>> {
        let statement = self.queries().select_where(predicate);
        debug!(sql = %statement, "Querying rows");

        let width = self.descriptor.row_width();
        let mut stmt = self
            .conn
            .prepare(&statement.sql)
            .map_err(ModelError::engine(&statement))?;
        let rows = stmt
            .query_map(params, |row| convert::read_row(row, width))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(ModelError::engine(&statement))?;

        rows.into_iter().map(convert::decode::<T>).collect()
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        let statement = self.queries().exists();
        self.query_exists(&statement, params![id])
    }

    pub fn exists_where<P: Params>(&self, predicate: &str, params: P) -> Result<bool> {
        let statement = self.queries().exists_where(predicate);
        self.query_exists(&statement, params)
    }

    /// Counts every row.
    pub fn count(&self) -> Result<i64> {
        self.count_where("", [])
    }

    /// Counts rows matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingCountRow`] if the engine yields no row.
    pub fn count_where<P: Params>(&self, predicate: &str, params: P) -> Result<i64> {
        let statement = self.queries().count_where(predicate);
        debug!(sql = %statement, "Counting rows");
        self.conn
            .query_row(&statement.sql, params, |row| row.get::<_, i64>(0))
            .optional()
            .map_err(ModelError::engine(&statement))?
            .ok_or_else(|| ModelError::MissingCountRow {
                table: self.descriptor.table_name.clone(),
            })
    }

    /// Runs `update t set <sets> where <predicate>` and returns the number of
    /// rows changed.
    ///
    /// Placeholders in `sets` and `predicate` share one parameter list.
    pub fn update_set<P: Params>(&self, sets: &str, predicate: &str, params: P) -> Result<usize> {
        let statement = self.queries().update_set(sets, predicate);
        self.execute(&statement, params)
    }

    /// Deletes the row with the given id, returning whether it existed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let statement = self.queries().delete();
        Ok(self.execute(&statement, params![id])? > 0)
    }

    /// Deletes rows matching `predicate` and returns how many were removed.
    pub fn delete_where<P: Params>(&self, predicate: &str, params: P) -> Result<usize> {
        let statement = self.queries().delete_where(predicate);
        self.execute(&statement, params)
    }

    /// Removes every row. Same as [`truncate`](Self::truncate).
    pub fn clear(&self) -> Result<usize> {
        self.truncate()
    }

    /// Removes every row.
    pub fn truncate(&self) -> Result<usize> {
        let statement = self.queries().truncate();
        self.execute(&statement, [])
    }

    fn query_one<P: Params>(&self, statement: &Statement, params: P) -> Result<T> {
        debug!(sql = %statement, "Querying row");
        let width = self.descriptor.row_width();
        let values = self
            .conn
            .query_row(&statement.sql, params, |row| convert::read_row(row, width))
            .optional()
            .map_err(ModelError::engine(statement))?
            .ok_or_else(|| ModelError::NotFound {
                table: self.descriptor.table_name.clone(),
            })?;
        convert::decode(values)
    }

    fn query_exists<P: Params>(&self, statement: &Statement, params: P) -> Result<bool> {
        debug!(sql = %statement, "Checking existence");
        let found = self
            .conn
            .query_row(&statement.sql, params, |_| Ok(()))
            .optional()
            .map_err(ModelError::engine(statement))?;
        Ok(found.is_some())
    }

    /// Runs a mutating statement in its own transaction.
    fn execute<P: Params>(&self, statement: &Statement, params: P) -> Result<usize> {
        debug!(sql = %statement, "Executing statement");
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(ModelError::engine(statement))?;
        let changed = tx
            .execute(&statement.sql, params)
            .map_err(ModelError::engine(statement))?;
        tx.commit().map_err(ModelError::engine(statement))?;
        Ok(changed)
    }
}

impl<T: Record + 'static> Model<T> {
    /// Inserts a dynamically typed record.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TypeMismatch`] if `record` is not a `T`.
    pub fn insert_any(&self, record: &dyn Any) -> Result<i64> {
        let record = record
            .downcast_ref::<T>()
            .ok_or_else(|| self.type_mismatch())?;
        self.insert(record)
    }

    /// Inserts dynamically typed records one by one.
    ///
    /// Every element is type-checked before anything is written.
    pub fn insert_all_any(&self, records: &[&dyn Any]) -> Result<Vec<i64>> {
        let typed = records
            .iter()
            .map(|record| record.downcast_ref::<T>().ok_or_else(|| self.type_mismatch()))
            .collect::<Result<Vec<&T>>>()?;
        typed.into_iter().map(|record| self.insert(record)).collect()
    }

    fn type_mismatch(&self) -> ModelError {
        ModelError::TypeMismatch {
            table: self.descriptor.table_name.clone(),
            expected: T::TYPE_NAME.to_string(),
        }
    }
}
