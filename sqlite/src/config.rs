//! Database locators and connection setup.
//!
//! A locator string is either empty (or `:memory:`), selecting an ephemeral
//! in-memory database, or a filesystem path. File databases are created on
//! first open; the parent directory must already exist. Read-only opens
//! never create anything.
//!
//! # Example
//!
//! ```
//! use tabula_sqlite::Locator;
//!
//! assert_eq!(Locator::parse(""), Locator::Memory);
//! assert_eq!(Locator::parse("./app.db"), Locator::File("./app.db".into()));
//! ```

use std::fmt;
use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};

/// Where a model's database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// Ephemeral in-memory database, discarded when the connection closes.
    #[default]
    Memory,
    /// File-backed database, created if absent.
    File(PathBuf),
}

impl Locator {
    /// Parses a locator string.
    pub fn parse(locator: &str) -> Self {
        match locator.trim() {
            "" | ":memory:" => Locator::Memory,
            path => Locator::File(PathBuf::from(path)),
        }
    }

    /// Opens (or creates) the database and applies connection pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Open`] if the engine cannot open the database,
    /// or [`ModelError::Engine`] if a pragma fails.
    pub fn open(&self) -> Result<Connection> {
        let conn = match self {
            Locator::Memory => Connection::open_in_memory(),
            Locator::File(path) => Connection::open(path),
        }
        .map_err(|source| ModelError::Open {
            locator: self.to_string(),
            source,
        })?;

        debug!(locator = %self, "Opened database");
        configure(&conn)?;
        Ok(conn)
    }

    /// Opens an existing database without write access.
    ///
    /// A memory locator yields a fresh, empty database.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Open`] if the file does not exist or cannot be
    /// opened.
    pub fn open_read_only(&self) -> Result<Connection> {
        let conn = match self {
            Locator::Memory => Connection::open_in_memory(),
            Locator::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        }
        .map_err(|source| ModelError::Open {
            locator: self.to_string(),
            source,
        })?;

        debug!(locator = %self, "Opened database read-only");
        configure(&conn)?;
        Ok(conn)
    }

    /// Returns `true` for a file locator whose file does not exist yet.
    pub fn is_missing(&self) -> bool {
        matches!(self, Locator::File(path) if !path.exists())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Memory => f.write_str(":memory:"),
            Locator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&str> for Locator {
    fn from(locator: &str) -> Self {
        Locator::parse(locator)
    }
}

impl From<String> for Locator {
    fn from(locator: String) -> Self {
        Locator::parse(&locator)
    }
}

impl From<PathBuf> for Locator {
    fn from(path: PathBuf) -> Self {
        Locator::File(path)
    }
}

impl From<&std::path::Path> for Locator {
    fn from(path: &std::path::Path) -> Self {
        Locator::File(path.to_path_buf())
    }
}

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// Applies the pragmas every model connection runs with.
pub(crate) fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(CONNECTION_PRAGMAS)
        .map_err(ModelError::engine(CONNECTION_PRAGMAS))
}
