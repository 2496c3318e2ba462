//! Conversion between records and engine rows.
//!
//! Records exchange positional [`Value`]s (id first, then fields in
//! declaration order). This module turns those into bind parameters for an
//! insert and rebuilds records from selected rows of the same shape.

use rusqlite::Row;
use rusqlite::types::Value as SqlValue;
use tabula_core::{Record, Value, ValueError};

use crate::error::Result;

/// Converts a record value into an engine value.
pub(crate) fn to_sql(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(i),
        Value::Real(f) => SqlValue::Real(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

/// Converts an engine value into a record value.
pub(crate) fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Integer(i),
        SqlValue::Real(f) => Value::Real(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Blob(b),
    }
}

/// Collects the insert parameters of `record`.
///
/// `positions` are record field positions in placeholder order; the id at
/// position 0 is never bound.
pub(crate) fn bind_values<T: Record>(record: &T, positions: &[usize]) -> Result<Vec<SqlValue>> {
    let values = record.to_values()?;
    let params = positions
        .iter()
        .map(|&position| {
            values
                .get(position)
                .cloned()
                .map(to_sql)
                .ok_or(ValueError::MissingValue("bound field"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(params)
}

/// Reads the first `width` columns of a row as record values.
pub(crate) fn read_row(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width)
        .map(|i| row.get::<_, SqlValue>(i).map(from_sql))
        .collect()
}

/// Rebuilds a record from a row read by [`read_row`].
pub(crate) fn decode<T: Record>(values: Vec<Value>) -> Result<T> {
    Ok(T::from_values(values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tabula_core::record;

    record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Reading {
            #[column = "id"]
            pub id: i64,
            #[column = "sensor"]
            pub sensor: String,
            #[column = "celsius"]
            pub celsius: Option<f64>,
        }
    }

    #[test]
    fn test_bind_values_skip_id() {
        let reading = Reading {
            id: 9,
            sensor: "north".to_string(),
            celsius: None,
        };
        let params = bind_values(&reading, &[1, 2]).unwrap();
        assert_eq!(
            params,
            vec![SqlValue::Text("north".to_string()), SqlValue::Null]
        );
    }

    #[test]
    fn test_bind_values_bad_position() {
        let err = bind_values(&Reading::default(), &[7]).unwrap_err();
        assert!(matches!(
            err,
            crate::ModelError::Value(ValueError::MissingValue(_))
        ));
    }

    #[test]
    fn test_read_and_decode_row() {
        let conn = Connection::open_in_memory().unwrap();
        let values: Vec<Value> = conn
            .query_row("select 4, 'south', 21.5, 'extra'", [], |row| read_row(row, 3))
            .unwrap();
        assert_eq!(values[0], Value::Integer(4));

        let reading: Reading = decode(values).unwrap();
        assert_eq!(
            reading,
            Reading {
                id: 4,
                sensor: "south".to_string(),
                celsius: Some(21.5),
            }
        );
    }

    #[test]
    fn test_decode_reports_field() {
        let err = decode::<Reading>(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Null,
        ])
        .unwrap_err();
        assert!(err.to_string().contains("sensor"));
    }
}
