//! SQL generation for one table.
//!
//! [`QueryBuilder`] renders every statement a model issues, DDL included,
//! from the table name and the ordered column list of a
//! [`TableDescriptor`]. Placeholders are positional (`?1`, `?2`, ...).
//! Reads project the id first and then the declared columns, so rows can
//! be decoded by position.
//!
//! Mutating statements are marked transactional; their textual form is
//! framed as `BEGIN TRANSACTION;...;COMMIT;` and executors run them inside
//! an engine transaction.

use std::fmt;

use crate::descriptor::{ColumnDescriptor, IndexDescriptor, TableDescriptor};
use crate::record::ID_COLUMN;

/// A generated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Single statement text, without transaction framing.
    pub sql: String,
    /// Whether the statement mutates and must run in a transaction.
    pub transactional: bool,
}

impl Statement {
    fn read(sql: String) -> Self {
        Self {
            sql,
            transactional: false,
        }
    }

    fn write(sql: String) -> Self {
        Self {
            sql,
            transactional: true,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transactional {
            write!(f, "BEGIN TRANSACTION;{};COMMIT;", self.sql)
        } else {
            f.write_str(&self.sql)
        }
    }
}

/// An insert statement together with the record positions it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub statement: Statement,
    /// Record field positions for `?1..?n`; the id (position 0) is skipped.
    pub bind_positions: Vec<usize>,
}

/// Normalizes a caller predicate into a where clause.
///
/// Leading whitespace is trimmed. A non-empty predicate that does not
/// already start with the `where` keyword gets `" where "` prepended; an
/// empty predicate means no filter.
///
/// # Examples
///
/// ```
/// use tabula_core::normalize_where;
///
/// assert_eq!(normalize_where(""), "");
/// assert_eq!(normalize_where("age > 10"), " where age > 10");
/// assert_eq!(normalize_where("where age > 10"), "where age > 10");
/// ```
pub fn normalize_where(predicate: &str) -> String {
    let predicate = predicate.trim_start();
    if predicate.is_empty() || starts_with_where(predicate) {
        predicate.to_string()
    } else {
        format!(" where {predicate}")
    }
}

fn starts_with_where(s: &str) -> bool {
    let Some(head) = s.get(..5) else {
        return false;
    };
    head.eq_ignore_ascii_case("where")
        && s[5..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '(')
}

/// Appends a normalized clause, keeping a separating space.
fn push_clause(sql: &mut String, clause: &str) {
    if clause.is_empty() {
        return;
    }
    if !clause.starts_with(char::is_whitespace) {
        sql.push(' ');
    }
    sql.push_str(clause);
}

/// Renders the statements of one table.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    table: &'a str,
    columns: &'a [ColumnDescriptor],
}

impl<'a> QueryBuilder<'a> {
    pub fn new(descriptor: &'a TableDescriptor) -> Self {
        Self {
            table: &descriptor.table_name,
            columns: &descriptor.columns,
        }
    }

    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `create table t (id integer primary key,c1 type1,...)`
    pub fn create_table(&self) -> Statement {
        let mut sql = format!("create table {} ({ID_COLUMN} integer primary key", self.table);
        for column in self.columns {
            sql.push(',');
            sql.push_str(&column.name);
            sql.push(' ');
            sql.push_str(&column.engine_type);
        }
        sql.push(')');
        Statement::write(sql)
    }

    pub fn add_column(&self, column: &ColumnDescriptor) -> Statement {
        Statement::write(format!(
            "alter table {} add column {} {}",
            self.table, column.name, column.engine_type
        ))
    }

    pub fn drop_column(&self, column: &str) -> Statement {
        Statement::write(format!("alter table {} drop column {column}", self.table))
    }

    /// `create [unique ]index <canonical name> on t (column)`
    pub fn create_index(&self, index: &IndexDescriptor) -> Statement {
        let unique = if index.is_unique { "unique " } else { "" };
        Statement::write(format!(
            "create {unique}index {} on {} ({})",
            index.canonical_name(),
            self.table,
            index.column_name
        ))
    }

    pub fn drop_index(&self, name: &str) -> Statement {
        Statement::write(format!("drop index {name}"))
    }

    /// Insert of every declared column, with the positions to bind.
    ///
    /// A table with no columns besides the id inserts `default values`.
    pub fn insert(&self) -> InsertStatement {
        if self.columns.is_empty() {
            return InsertStatement {
                statement: Statement::write(format!("insert into {} default values", self.table)),
                bind_positions: Vec::new(),
            };
        }
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "insert into {} ({}) values ({placeholders})",
            self.table,
            self.column_list()
        );
        InsertStatement {
            statement: Statement::write(sql),
            bind_positions: self.columns.iter().map(|c| c.position).collect(),
        }
    }

    /// `select id,c1,...,cn from t`
    pub fn select(&self) -> Statement {
        let mut sql = format!("select {ID_COLUMN}");
        for column in self.columns {
            sql.push(',');
            sql.push_str(&column.name);
        }
        sql.push_str(" from ");
        sql.push_str(self.table);
        Statement::read(sql)
    }

    /// Select of the row with id `?1`.
    pub fn find(&self) -> Statement {
        let mut statement = self.select();
        statement.sql.push_str(&format!(" where {ID_COLUMN} = ?1"));
        statement
    }

    pub fn select_where(&self, predicate: &str) -> Statement {
        let mut statement = self.select();
        push_clause(&mut statement.sql, &normalize_where(predicate));
        statement
    }

    pub fn exists(&self) -> Statement {
        Statement::read(format!(
            "select 1 from {} where {ID_COLUMN} = ?1 limit 1",
            self.table
        ))
    }

    pub fn exists_where(&self, predicate: &str) -> Statement {
        let mut sql = format!("select 1 from {}", self.table);
        push_clause(&mut sql, &normalize_where(predicate));
        sql.push_str(" limit 1");
        Statement::read(sql)
    }

    pub fn count_where(&self, predicate: &str) -> Statement {
        let mut sql = format!("select count(*) from {}", self.table);
        push_clause(&mut sql, &normalize_where(predicate));
        Statement::read(sql)
    }

    /// `update t set <sets>[ where <predicate>]`
    pub fn update_set(&self, sets: &str, predicate: &str) -> Statement {
        let mut sql = format!("update {} set {}", self.table, sets.trim());
        push_clause(&mut sql, &normalize_where(predicate));
        Statement::write(sql)
    }

    pub fn delete(&self) -> Statement {
        Statement::write(format!("delete from {} where {ID_COLUMN} = ?1", self.table))
    }

    pub fn delete_where(&self, predicate: &str) -> Statement {
        let mut sql = format!("delete from {}", self.table);
        push_clause(&mut sql, &normalize_where(predicate));
        Statement::write(sql)
    }

    /// Removes every row; the dialect has no `truncate`.
    pub fn truncate(&self) -> Statement {
        Statement::write(format!("delete from {}", self.table))
    }
}
