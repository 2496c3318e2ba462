//! Error types for model construction and CRUD operations.
//!
//! Reconciliation failures (declaration errors, drift) abort model
//! construction; every other variant is returned from individual calls and
//! never retried internally.

use tabula_core::{SchemaError, ValueError};
use thiserror::Error;

/// Errors that can occur while reconciling or querying a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The record type's declaration is malformed or has an unmapped type.
    #[error("invalid record declaration: {0}")]
    Schema(#[from] SchemaError),

    /// A declared column's type differs from the live column's type.
    #[error(
        "column '{column}' of table '{table}' has local type '{local}' but remote type '{remote}'"
    )]
    ColumnDrift {
        table: String,
        column: String,
        local: String,
        remote: String,
    },

    /// A declared index's uniqueness differs from the live index.
    #[error("index '{index}' unique option is inconsistent with remote database: {local} vs {remote}")]
    IndexDrift {
        index: String,
        local: bool,
        remote: bool,
    },

    /// The database could not be opened.
    #[error("failed to open database {locator}: {source}")]
    Open {
        locator: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The engine rejected a statement.
    #[error("{source}: `{sql}`")]
    Engine {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A single-row lookup matched nothing.
    #[error("no rows in table '{table}'")]
    NotFound { table: String },

    /// A count query returned no row at all.
    #[error("count query on table '{table}' returned no row")]
    MissingCountRow { table: String },

    /// A dynamically typed record is not the model's record type.
    #[error("wrong record type for table '{table}': expected {expected}")]
    TypeMismatch { table: String, expected: String },

    /// A field value could not be converted.
    #[error("value conversion failed: {0}")]
    Value(#[from] ValueError),
}

impl ModelError {
    /// Returns a mapper wrapping an engine error with the statement text.
    pub(crate) fn engine(sql: impl ToString) -> impl FnOnce(rusqlite::Error) -> Self {
        let sql = sql.to_string();
        move |source| ModelError::Engine { sql, source }
    }

    /// Returns `true` for [`ModelError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }
}

/// Convenience alias for results with [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;
