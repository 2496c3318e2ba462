//! Remote catalog access and schema diffing.
//!
//! The engine's catalog is read through the `pragma_table_info`,
//! `pragma_index_list`, and `pragma_index_info` table-valued functions.
//! [`plan`] compares those rows with a [`TableDescriptor`] and returns the
//! ordered list of [`SchemaChange`]s that converge the live table to the
//! declared one. Planning is pure: every drift check runs before any change
//! is applied.
//!
//! # Destructive narrowing
//!
//! The declared record is the source of truth. Remote columns and indexes
//! it does not declare are planned for removal, and the data in dropped
//! columns is lost. Only the primary key, its canonical index, and
//! engine-owned indexes are exempt.
//!
//! Names are matched ignoring ASCII case, as the engine resolves
//! identifiers.

use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tabula_core::{
    ColumnDescriptor, ID_COLUMN, IndexDescriptor, TableDescriptor, is_primary_key_index,
};
use tracing::debug;

use crate::error::{ModelError, Result};

/// A column as reported by the engine catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteColumn {
    pub table_name: String,
    /// Informational only; never used for binding.
    pub ordinal: i64,
    pub name: String,
    pub column_type: String,
    pub primary_key: bool,
}

/// An index as reported by the engine catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIndex {
    pub table_name: String,
    /// First indexed column; `None` for expression indexes.
    pub column_name: Option<String>,
    pub name: String,
    pub is_unique: bool,
    /// `c` for `CREATE INDEX`, `u` / `pk` for constraint-owned indexes.
    pub origin: String,
}

impl RemoteIndex {
    /// Whether the index was created by a `CREATE INDEX` statement and can
    /// therefore be dropped.
    pub fn is_droppable(&self) -> bool {
        self.origin == "c"
    }
}

const DESCRIBE_TABLE_SQL: &str =
    "SELECT cid, name, type, pk FROM pragma_table_info(?1) ORDER BY cid";

const LIST_INDEXES_SQL: &str = "SELECT il.name, il.\"unique\", il.origin, ii.name \
     FROM pragma_index_list(?1) AS il, pragma_index_info(il.name) AS ii \
     ORDER BY il.seq, ii.seqno";

/// Reads the column catalog of `table`. An empty result means the table
/// does not exist.
pub fn describe_table(conn: &Connection, table: &str) -> Result<Vec<RemoteColumn>> {
    debug!(table, "Reading column catalog");
    let mut stmt = conn
        .prepare(DESCRIBE_TABLE_SQL)
        .map_err(ModelError::engine(DESCRIBE_TABLE_SQL))?;
    let columns = stmt
        .query_map(params![table], |row| {
            Ok(RemoteColumn {
                table_name: table.to_string(),
                ordinal: row.get(0)?,
                name: row.get(1)?,
                column_type: row.get(2)?,
                primary_key: row.get::<_, i64>(3)? > 0,
            })
        })
        .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(ModelError::engine(DESCRIBE_TABLE_SQL))?;
    Ok(columns)
}

/// Reads the index catalog of `table`, one entry per index.
pub fn list_indexes(conn: &Connection, table: &str) -> Result<Vec<RemoteIndex>> {
    debug!(table, "Reading index catalog");
    let mut stmt = conn
        .prepare(LIST_INDEXES_SQL)
        .map_err(ModelError::engine(LIST_INDEXES_SQL))?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)? != 0,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(ModelError::engine(LIST_INDEXES_SQL))?;

    // multi-column indexes yield one row per column; keep the first
    let mut indexes: Vec<RemoteIndex> = Vec::new();
    for (name, is_unique, origin, column_name) in rows {
        if indexes.last().is_some_and(|last| last.name == name) {
            continue;
        }
        indexes.push(RemoteIndex {
            table_name: table.to_string(),
            column_name,
            name,
            is_unique,
            origin,
        });
    }
    Ok(indexes)
}

/// One DDL step of a reconciliation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SchemaChange {
    /// The table did not exist and is created with every declared column.
    CreateTable { table: String },
    AddColumn { table: String, column: ColumnDescriptor },
    /// Destructive: the column's data is discarded.
    DropColumn { table: String, column: String },
    CreateIndex { index: IndexDescriptor },
    DropIndex { table: String, name: String },
}

impl SchemaChange {
    /// Returns `true` for changes that discard data or indexes.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            SchemaChange::DropColumn { .. } | SchemaChange::DropIndex { .. }
        )
    }
}

/// The outcome of diffing a descriptor against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaPlan {
    /// `true` when the table is absent and will be created.
    pub creates_table: bool,
    /// Changes in execution order.
    pub changes: Vec<SchemaChange>,
}

impl SchemaPlan {
    /// Returns `true` if the live schema already matches.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Computes the changes that bring the remote table in line with `desc`.
///
/// With no remote columns the table is created, followed by the
/// primary-key index and every declared index. Otherwise the plan is, in
/// order: added columns, dropped indexes, dropped columns, created indexes.
/// Stale indexes go first because the engine refuses to drop an indexed
/// column.
///
/// # Errors
///
/// Returns [`ModelError::ColumnDrift`] when a column exists on both sides
/// with different base types, and [`ModelError::IndexDrift`] when an index
/// exists on both sides with different uniqueness. No change is planned in
/// either case.
pub fn plan(
    desc: &TableDescriptor,
    remote_columns: &[RemoteColumn],
    remote_indexes: &[RemoteIndex],
) -> Result<SchemaPlan> {
    if remote_columns.is_empty() {
        let mut changes = vec![SchemaChange::CreateTable {
            table: desc.table_name.clone(),
        }];
        changes.push(SchemaChange::CreateIndex {
            index: desc.primary_key_index(),
        });
        changes.extend(
            desc.indexes
                .iter()
                .cloned()
                .map(|index| SchemaChange::CreateIndex { index }),
        );
        return Ok(SchemaPlan {
            creates_table: true,
            changes,
        });
    }

    let (add_columns, drop_columns) = plan_columns(desc, remote_columns)?;
    let (create_indexes, drop_indexes) = plan_indexes(desc, remote_indexes)?;

    let mut changes = add_columns;
    changes.extend(drop_indexes);
    changes.extend(drop_columns);
    changes.extend(create_indexes);
    Ok(SchemaPlan {
        creates_table: false,
        changes,
    })
}

/// Diffs columns, returning `(adds, drops)`.
fn plan_columns(
    desc: &TableDescriptor,
    remote_columns: &[RemoteColumn],
) -> Result<(Vec<SchemaChange>, Vec<SchemaChange>)> {
    let remote: HashMap<String, &RemoteColumn> = remote_columns
        .iter()
        .filter(|c| !is_identifier_column(c))
        .map(|c| (c.name.to_ascii_lowercase(), c))
        .collect();
    let local_names: HashSet<String> = desc
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .collect();

    let mut adds = Vec::new();
    for local in &desc.columns {
        match remote.get(&local.name.to_ascii_lowercase()) {
            None => adds.push(SchemaChange::AddColumn {
                table: desc.table_name.clone(),
                column: local.clone(),
            }),
            Some(remote) => check_column_type(desc, local, remote)?,
        }
    }

    let drops = remote_columns
        .iter()
        .filter(|c| !is_identifier_column(c))
        .filter(|c| !local_names.contains(&c.name.to_ascii_lowercase()))
        .map(|c| SchemaChange::DropColumn {
            table: desc.table_name.clone(),
            column: c.name.clone(),
        })
        .collect();

    Ok((adds, drops))
}

fn is_identifier_column(column: &RemoteColumn) -> bool {
    column.primary_key || column.name.eq_ignore_ascii_case(ID_COLUMN)
}

fn check_column_type(
    desc: &TableDescriptor,
    local: &ColumnDescriptor,
    remote: &RemoteColumn,
) -> Result<()> {
    if local.base_type().eq_ignore_ascii_case(&remote.column_type) {
        return Ok(());
    }
    Err(ModelError::ColumnDrift {
        table: desc.table_name.clone(),
        column: local.name.clone(),
        local: local.base_type().to_string(),
        remote: remote.column_type.clone(),
    })
}

/// Diffs indexes by canonical name, returning `(creates, drops)`.
fn plan_indexes(
    desc: &TableDescriptor,
    remote_indexes: &[RemoteIndex],
) -> Result<(Vec<SchemaChange>, Vec<SchemaChange>)> {
    let remote: HashMap<String, &RemoteIndex> = remote_indexes
        .iter()
        .map(|i| (i.name.to_ascii_lowercase(), i))
        .collect();

    let mut local_names = HashSet::new();
    let mut creates = Vec::new();
    for local in &desc.indexes {
        let name = local.canonical_name();
        let key = name.to_ascii_lowercase();
        match remote.get(&key) {
            None => creates.push(SchemaChange::CreateIndex {
                index: local.clone(),
            }),
            Some(remote) if remote.is_unique != local.is_unique => {
                return Err(ModelError::IndexDrift {
                    index: name,
                    local: local.is_unique,
                    remote: remote.is_unique,
                });
            }
            Some(_) => {}
        }
        local_names.insert(key);
    }

    let drops = remote_indexes
        .iter()
        .filter(|i| i.is_droppable())
        .filter(|i| !is_primary_key_index(&desc.table_name, &i.name))
        .filter(|i| !local_names.contains(&i.name.to_ascii_lowercase()))
        .map(|i| SchemaChange::DropIndex {
            table: desc.table_name.clone(),
            name: i.name.clone(),
        })
        .collect();

    Ok((creates, drops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{FieldType, Kind};

    fn descriptor() -> TableDescriptor {
        TableDescriptor {
            type_name: "Student".to_string(),
            table_name: "student".to_string(),
            columns: vec![
                ColumnDescriptor::new("age", "age", FieldType::new(Kind::I64), 1).unwrap(),
                ColumnDescriptor::new("name", "name", FieldType::new(Kind::Text), 2).unwrap(),
            ],
            indexes: vec![IndexDescriptor {
                table_name: "student".to_string(),
                column_name: "age".to_string(),
                is_unique: true,
                primary_key: false,
            }],
        }
    }

    fn remote_column(ordinal: i64, name: &str, column_type: &str) -> RemoteColumn {
        RemoteColumn {
            table_name: "student".to_string(),
            ordinal,
            name: name.to_string(),
            column_type: column_type.to_string(),
            primary_key: name == "id",
        }
    }

    fn remote_index(name: &str, column: &str, is_unique: bool) -> RemoteIndex {
        RemoteIndex {
            table_name: "student".to_string(),
            column_name: Some(column.to_string()),
            name: name.to_string(),
            is_unique,
            origin: "c".to_string(),
        }
    }

    fn live_columns() -> Vec<RemoteColumn> {
        vec![
            remote_column(0, "id", "integer"),
            remote_column(1, "age", "int64"),
            remote_column(2, "name", "text"),
        ]
    }

    fn live_indexes() -> Vec<RemoteIndex> {
        vec![
            remote_index("student_id_pkey_idx", "id", true),
            remote_index("student_age_idx", "age", true),
        ]
    }

    #[test]
    fn test_missing_table_is_created_with_indexes() {
        let plan = plan(&descriptor(), &[], &[]).unwrap();
        assert!(plan.creates_table);
        assert_eq!(
            plan.changes[0],
            SchemaChange::CreateTable {
                table: "student".to_string()
            }
        );
        let index_names: Vec<_> = plan.changes[1..]
            .iter()
            .map(|c| match c {
                SchemaChange::CreateIndex { index } => index.canonical_name(),
                other => panic!("unexpected change {other:?}"),
            })
            .collect();
        assert_eq!(index_names, vec!["student_id_pkey_idx", "student_age_idx"]);
    }

    #[test]
    fn test_matching_schema_plans_nothing() {
        let plan = plan(&descriptor(), &live_columns(), &live_indexes()).unwrap();
        assert!(!plan.creates_table);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_type_comparison_ignores_case() {
        let mut columns = live_columns();
        columns[1].column_type = "INT64".to_string();
        assert!(plan(&descriptor(), &columns, &live_indexes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_is_added() {
        let columns = &live_columns()[..2];
        let plan = plan(&descriptor(), columns, &live_indexes()).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert!(matches!(
            &plan.changes[0],
            SchemaChange::AddColumn { column, .. } if column.name == "name"
        ));
    }

    #[test]
    fn test_type_drift_is_fatal_and_plans_nothing() {
        let mut columns = live_columns();
        columns[1].column_type = "int32".to_string();
        columns.remove(2);
        let err = plan(&descriptor(), &columns, &live_indexes()).unwrap_err();
        match err {
            ModelError::ColumnDrift {
                column,
                local,
                remote,
                ..
            } => {
                assert_eq!(column, "age");
                assert_eq!(local, "int64");
                assert_eq!(remote, "int32");
            }
            other => panic!("expected drift, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_column_is_dropped_after_its_index() {
        let mut columns = live_columns();
        columns.push(remote_column(3, "nickname", "text"));
        let mut indexes = live_indexes();
        indexes.push(remote_index("student_nickname_idx", "nickname", false));

        let plan = plan(&descriptor(), &columns, &indexes).unwrap();
        assert_eq!(
            plan.changes,
            vec![
                SchemaChange::DropIndex {
                    table: "student".to_string(),
                    name: "student_nickname_idx".to_string()
                },
                SchemaChange::DropColumn {
                    table: "student".to_string(),
                    column: "nickname".to_string()
                },
            ]
        );
        assert!(plan.changes.iter().all(SchemaChange::is_destructive));
    }

    #[test]
    fn test_primary_key_column_is_never_dropped() {
        let mut columns = live_columns();
        columns[0].name = "rowid_alias".to_string();
        let plan = plan(&descriptor(), &columns, &live_indexes()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_names_match_ignoring_case() {
        let mut columns = live_columns();
        columns[0].name = "ID".to_string();
        columns[2].name = "NAME".to_string();
        let mut indexes = live_indexes();
        indexes[0].name = "STUDENT_ID_PKEY_IDX".to_string();
        indexes[1].name = "Student_Age_Idx".to_string();

        let plan = plan(&descriptor(), &columns, &indexes).unwrap();
        assert!(plan.is_empty(), "unexpected changes {:?}", plan.changes);

        // drift is still detected through a differently cased name
        indexes[1].is_unique = false;
        let err = plan_indexes(&descriptor(), &indexes).unwrap_err();
        assert!(matches!(err, ModelError::IndexDrift { .. }));
    }

    #[test]
    fn test_missing_index_is_created() {
        let indexes = &live_indexes()[..1];
        let plan = plan(&descriptor(), &live_columns(), indexes).unwrap();
        assert!(matches!(
            &plan.changes[..],
            [SchemaChange::CreateIndex { index }] if index.canonical_name() == "student_age_idx"
        ));
    }

    #[test]
    fn test_uniqueness_drift_is_fatal() {
        let mut indexes = live_indexes();
        indexes[1].is_unique = false;
        let err = plan(&descriptor(), &live_columns(), &indexes).unwrap_err();
        assert!(matches!(
            err,
            ModelError::IndexDrift {
                local: true,
                remote: false,
                ..
            }
        ));
    }

    #[test]
    fn test_exempt_indexes_are_kept() {
        let mut indexes = live_indexes();
        indexes.push(RemoteIndex {
            origin: "u".to_string(),
            ..remote_index("sqlite_autoindex_student_1", "name", true)
        });
        let plan = plan(&descriptor(), &live_columns(), &indexes).unwrap();
        assert!(plan.is_empty());

        // only the exact canonical name is exempt
        let mut indexes = live_indexes();
        indexes.push(remote_index("student_id_pkey_idx_copy", "id", false));
        let plan = super::plan(&descriptor(), &live_columns(), &indexes).unwrap();
        assert_eq!(plan.changes.len(), 1);
    }

    #[test]
    fn test_plan_serializes_for_reports() {
        let plan = plan(&descriptor(), &[], &[]).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["changes"][0]["change"], "create_table");
    }

    #[test]
    fn test_catalog_reads() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(describe_table(&conn, "student").unwrap().is_empty());
        assert!(list_indexes(&conn, "student").unwrap().is_empty());

        conn.execute_batch(
            "create table student (id integer primary key, age int32 not null default 0, name text unique);
             create index student_age_idx on student (age);",
        )
        .unwrap();

        let columns = describe_table(&conn, "student").unwrap();
        let shape: Vec<_> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type.as_str(), c.primary_key))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("id", "integer", true),
                ("age", "int32", false),
                ("name", "text", false)
            ]
        );

        let indexes = list_indexes(&conn, "student").unwrap();
        let age = indexes.iter().find(|i| i.name == "student_age_idx").unwrap();
        assert_eq!(age.column_name.as_deref(), Some("age"));
        assert!(!age.is_unique);
        assert!(age.is_droppable());

        let auto = indexes.iter().find(|i| i.origin == "u").unwrap();
        assert!(auto.is_unique);
        assert!(!auto.is_droppable());
    }

    #[test]
    fn test_upper_case_live_column_is_reused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "create table student (id integer primary key, age int64, NAME text);
             create unique index STUDENT_AGE_IDX on student (age);",
        )
        .unwrap();

        let columns = describe_table(&conn, "student").unwrap();
        let indexes = list_indexes(&conn, "student").unwrap();
        let plan = plan(&descriptor(), &columns, &indexes).unwrap();
        assert!(plan.is_empty(), "unexpected changes {:?}", plan.changes);
    }
}
