//! Identifier helpers: snake-case checks and table-name derivation.

use convert_case::{Case, Casing};

/// Converts `s` to snake case.
pub fn to_snake(s: &str) -> String {
    s.to_case(Case::Snake)
}

/// Returns `true` when snake-casing `s` leaves it unchanged.
pub fn is_snake_case(s: &str) -> bool {
    !s.is_empty() && to_snake(s) == s
}

/// Returns `true` if `s` can be used unquoted as a table, column, or index
/// name: ASCII lowercase letters, digits, and underscores, not starting
/// with a digit.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Derives a table name from a record type name.
///
/// The name is snake-cased; `user` and `order` are pluralized because they
/// collide with SQL keywords.
///
/// # Examples
///
/// ```
/// use tabula_core::to_table_name;
///
/// assert_eq!(to_table_name("StudentRecord"), "student_record");
/// assert_eq!(to_table_name("User"), "users");
/// ```
pub fn to_table_name(type_name: &str) -> String {
    let name = to_snake(type_name);
    match name.as_str() {
        "user" | "order" => format!("{name}s"),
        _ => name,
    }
}
