//! OData string literal escaping

/// Escape a value for interpolation inside a single-quoted OData literal.
///
/// Single quotes are doubled (`'` becomes `''`); nothing else changes.
/// Apply exactly once: escaping an already escaped value doubles the quotes again.
pub fn escape_odata_string(value: &str) -> String {
    value.replace('\'', "''")
}
