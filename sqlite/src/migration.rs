//! Applying reconciliation plans to a live database.
//!
//! [`reconcile`] reads the catalog for a descriptor's table, asks
//! [`schema::plan`](crate::schema::plan) for the changes, and executes them
//! in order. Each DDL statement commits in its own transaction, so a
//! failure part-way leaves the earlier changes applied; re-running
//! reconciliation resumes from the new state.
//!
//! Every applied change is reported to an [`EventSink`] and logged:
//! additive changes at `info`, destructive ones at `warn`.
//!
//! # Example
//!
//! ```
//! use rusqlite::Connection;
//! use tabula_core::{TableDescriptor, record};
//! use tabula_sqlite::{SchemaChange, reconcile};
//!
//! record! {
//!     pub struct Tag {
//!         #[column = "id"]
//!         pub id: i64,
//!         #[column = "label"]
//!         pub label: String,
//!     }
//! }
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let desc = TableDescriptor::of::<Tag>().unwrap();
//!
//! let mut events: Vec<SchemaChange> = Vec::new();
//! let plan = reconcile(&conn, &desc, &mut events).unwrap();
//! assert!(plan.creates_table);
//! assert_eq!(events.len(), 2);
//!
//! // a second pass finds nothing to do
//! assert!(reconcile(&conn, &desc, &mut ()).unwrap().is_empty());
//! ```

use rusqlite::Connection;
use tabula_core::{QueryBuilder, Statement, TableDescriptor};
use tracing::{debug, info, warn};

use crate::error::{ModelError, Result};
use crate::schema::{self, SchemaChange, SchemaPlan};

/// Receives each schema change after it has been applied.
pub trait EventSink {
    fn schema_changed(&mut self, table: &str, change: &SchemaChange);
}

/// Discards events.
impl EventSink for () {
    fn schema_changed(&mut self, _table: &str, _change: &SchemaChange) {}
}

/// Collects events in application order.
impl EventSink for Vec<SchemaChange> {
    fn schema_changed(&mut self, _table: &str, change: &SchemaChange) {
        self.push(change.clone());
    }
}

/// Brings the table described by `desc` in line with the declaration.
///
/// Returns the plan that was applied; [`SchemaPlan::creates_table`] tells
/// whether the table was newly created.
///
/// # Errors
///
/// Drift errors are returned before any DDL runs. An engine failure while
/// applying a change is returned as [`ModelError::Engine`] carrying the
/// framed statement; changes applied before it stay committed.
pub fn reconcile(
    conn: &Connection,
    desc: &TableDescriptor,
    sink: &mut dyn EventSink,
) -> Result<SchemaPlan> {
    let remote_columns = schema::describe_table(conn, &desc.table_name)?;
    let remote_indexes = schema::list_indexes(conn, &desc.table_name)?;
    let plan = schema::plan(desc, &remote_columns, &remote_indexes)?;

    if plan.is_empty() {
        debug!(table = %desc.table_name, "Schema is up to date");
        return Ok(plan);
    }

    let builder = QueryBuilder::new(desc);
    for change in &plan.changes {
        apply_change(conn, &builder, change)?;
        log_change(&desc.table_name, change);
        sink.schema_changed(&desc.table_name, change);
    }

    info!(
        table = %desc.table_name,
        changes = plan.changes.len(),
        created = plan.creates_table,
        "Reconciled schema"
    );
    Ok(plan)
}

/// Renders the statement for one change.
pub fn change_statement(builder: &QueryBuilder<'_>, change: &SchemaChange) -> Statement {
    match change {
        SchemaChange::CreateTable { .. } => builder.create_table(),
        SchemaChange::AddColumn { column, .. } => builder.add_column(column),
        SchemaChange::DropColumn { column, .. } => builder.drop_column(column),
        SchemaChange::CreateIndex { index } => builder.create_index(index),
        SchemaChange::DropIndex { name, .. } => builder.drop_index(name),
    }
}

fn apply_change(conn: &Connection, builder: &QueryBuilder<'_>, change: &SchemaChange) -> Result<()> {
    let statement = change_statement(builder, change);
    debug!(sql = %statement, "Applying schema change");
    execute_in_transaction(conn, &statement)
}

/// Runs a parameterless statement in its own transaction.
pub(crate) fn execute_in_transaction(conn: &Connection, statement: &Statement) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(ModelError::engine(statement))?;
    tx.execute_batch(&statement.sql)
        .map_err(ModelError::engine(statement))?;
    tx.commit().map_err(ModelError::engine(statement))
}

fn log_change(table: &str, change: &SchemaChange) {
    match change {
        SchemaChange::CreateTable { .. } => info!(table, "Created table"),
        SchemaChange::AddColumn { column, .. } => {
            info!(table, column = %column.name, engine_type = %column.engine_type, "Added column")
        }
        SchemaChange::DropColumn { column, .. } => {
            warn!(table, column = %column, "Dropped column not present in record; its data is lost")
        }
        SchemaChange::CreateIndex { index } => {
            info!(table, index = %index.canonical_name(), unique = index.is_unique, "Created index")
        }
        SchemaChange::DropIndex { name, .. } => {
            warn!(table, index = %name, "Dropped index not present in record")
        }
    }
}
