//! The record capability: declared fields, tags, and positional values.
//!
//! A type becomes storable by implementing [`Record`], usually through the
//! [`record!`](crate::record) macro. The trait exposes the declared field
//! list once (names, [`FieldType`]s, and tags) and moves values in and out
//! of a record strictly by declaration order.
//!
//! # Tags
//!
//! Each field carries `key = "value"` tags, written as attributes inside
//! `record!`:
//!
//! - `column` (required): the column name, snake case. The first field must
//!   be `#[column = "id"] id: i64`.
//! - `index` (optional): comma-separated index flags; `""` declares a plain
//!   index, `"unique"` (or `"uniq"`) a unique one.
//!
//! Doc comments are kept on the generated fields and are otherwise
//! ignored, like any other key.

use crate::error::ValueError;
use crate::naming::to_table_name;
use crate::types::FieldType;
use crate::value::Value;

/// Tag key naming a field's column.
pub const COLUMN_TAG: &str = "column";
/// Tag key declaring an index on a field's column.
pub const INDEX_TAG: &str = "index";
/// Column name reserved for the primary key.
pub const ID_COLUMN: &str = "id";

/// One declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// The Rust field identifier.
    pub ident: &'static str,
    /// The field's semantic type.
    pub ty: FieldType,
    /// `(key, value)` tags in declaration order.
    pub tags: &'static [(&'static str, &'static str)],
}

impl FieldDecl {
    pub fn new(
        ident: &'static str,
        ty: FieldType,
        tags: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { ident, ty, tags }
    }

    /// Looks up a tag value by key.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn column_tag(&self) -> Option<&'static str> {
        self.tag(COLUMN_TAG)
    }

    pub fn index_tag(&self) -> Option<&'static str> {
        self.tag(INDEX_TAG)
    }
}

/// A type that can be stored as one row of a table.
///
/// Values are exchanged positionally: [`to_values`](Record::to_values)
/// returns every field, id first, in declaration order, and
/// [`from_values`](Record::from_values) consumes a row in that same order.
pub trait Record: Sized {
    /// The Rust type name, used to derive the table name.
    const TYPE_NAME: &'static str;

    /// All declared fields, id first.
    fn fields() -> Vec<FieldDecl>;

    /// Table name for this record type.
    fn table_name() -> String {
        to_table_name(Self::TYPE_NAME)
    }

    /// Reads every field in declaration order.
    fn to_values(&self) -> Result<Vec<Value>, ValueError>;

    /// Builds a record from a row laid out in declaration order.
    fn from_values(values: Vec<Value>) -> Result<Self, ValueError>;
}

/// Declares a struct and implements [`Record`] for it.
///
/// # Examples
///
/// ```
/// use tabula_core::{record, Record, TableDescriptor};
///
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Student {
///         #[column = "id"]
///         pub id: i64,
///         #[column = "age"]
///         #[index = "unique"]
///         pub age: i64,
///         #[column = "update_time"]
///         #[index = ""]
///         pub update_time: i64,
///         #[column = "nickname"]
///         pub nickname: Option<String>,
///     }
/// }
///
/// let descriptor = TableDescriptor::of::<Student>().unwrap();
/// assert_eq!(descriptor.table_name, "student");
/// assert_eq!(descriptor.columns.len(), 3);
/// assert_eq!(Student::fields()[1].index_tag(), Some("unique"));
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$tag:ident = $value:literal])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $( #[doc = $crate::__record_doc!($tag = $value)] )*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn fields() -> ::std::vec::Vec<$crate::FieldDecl> {
                ::std::vec![
                    $(
                        $crate::FieldDecl::new(
                            stringify!($field),
                            <$ty as $crate::ColumnValue>::field_type(),
                            &[ $( (stringify!($tag), $value) ),* ],
                        ),
                    )*
                ]
            }

            fn to_values(
                &self,
            ) -> ::std::result::Result<::std::vec::Vec<$crate::Value>, $crate::ValueError> {
                ::std::result::Result::Ok(::std::vec![
                    $(
                        $crate::ColumnValue::to_value(&self.$field)
                            .map_err(|e| e.in_field(stringify!($field)))?,
                    )*
                ])
            }

            fn from_values(
                values: ::std::vec::Vec<$crate::Value>,
            ) -> ::std::result::Result<Self, $crate::ValueError> {
                let mut values = values.into_iter();
                ::std::result::Result::Ok(Self {
                    $( $field: $crate::decode_next(&mut values, stringify!($field))?, )*
                })
            }
        }
    };
}

/// Expands a field tag to its doc text: the comment itself for `doc`, and
/// nothing for every other key.
#[doc(hidden)]
#[macro_export]
macro_rules! __record_doc {
    (doc = $value:literal) => {
        $value
    };
    ($tag:ident = $value:literal) => {
        ""
    };
}

#[cfg(test)]
mod tests {
    use crate::types::Kind;
    use crate::Record;

    record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Sample {
            #[column = "id"]
            id: i64,
            /// Display name.
            #[column = "name"]
            name: String,
            #[column = "score"]
            #[index = "uniq"]
            score: Option<f64>,
            #[column = "payload"]
            payload: Vec<u8>,
        }
    }

    #[test]
    fn test_fields_follow_declaration_order() {
        let fields = Sample::fields();
        let idents: Vec<_> = fields.iter().map(|f| f.ident).collect();
        assert_eq!(idents, vec!["id", "name", "score", "payload"]);
        assert_eq!(fields[0].column_tag(), Some("id"));
        assert_eq!(fields[2].index_tag(), Some("uniq"));
        assert_eq!(fields[2].ty.kind, Kind::F64);
        assert!(fields[2].ty.nullable);
    }

    #[test]
    fn test_doc_comment_is_an_ignored_tag() {
        let fields = Sample::fields();
        assert_eq!(fields[1].column_tag(), Some("name"));
        assert!(fields[1].tag("doc").is_some());
        assert_eq!(fields[1].index_tag(), None);
    }

    #[test]
    fn test_doc_tags_are_reemitted() {
        assert_eq!(crate::__record_doc!(doc = " Display name."), " Display name.");
        assert_eq!(crate::__record_doc!(column = "name"), "");
        assert_eq!(crate::__record_doc!(index = "unique"), "");
    }

    #[test]
    fn test_values_roundtrip_positionally() {
        let sample = Sample {
            id: 4,
            name: "ada".to_string(),
            score: Some(9.5),
            payload: vec![1, 2, 3],
        };
        let values = sample.to_values().unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(Sample::from_values(values).unwrap(), sample);
    }

    #[test]
    fn test_short_row_fails() {
        let err = Sample::from_values(vec![crate::Value::Integer(1)]).unwrap_err();
        assert_eq!(err, crate::ValueError::MissingValue("name"));
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(Sample::table_name(), "sample");
    }
}
