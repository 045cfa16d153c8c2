//! Key encoding utilities for metadata rows.
//!
//! Online-DDL rows are keyed by `(source_id, ghost_schema, ghost_table)`. The
//! components are joined with a NUL byte, which MySQL identifiers cannot
//! contain, so the encoding is unambiguous and every row of one source shares
//! the `{source_id}\0` prefix.

pub const KEY_SEPARATOR: u8 = 0;

/// Encode a metadata row key: `{source_id}\0{schema}\0{table}`
///
/// # Examples
///
/// ```
/// use ghostline_store::key_encoding::row_key;
///
/// let key = row_key("mysql-replica-01", "db", "_t_gho");
/// assert_eq!(key, b"mysql-replica-01\0db\0_t_gho".to_vec());
/// ```
pub fn row_key(source_id: &str, schema: &str, table: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(source_id.len() + schema.len() + table.len() + 2);
    key.extend_from_slice(source_id.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(schema.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(table.as_bytes());
    key
}

/// Prefix shared by every row key of one source: `{source_id}\0`
pub fn source_prefix(source_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(source_id.len() + 1);
    prefix.extend_from_slice(source_id.as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix
}

/// Parse a metadata row key into `(source_id, schema, table)`
///
/// Returns `None` for keys that were not produced by [`row_key`].
pub fn parse_row_key(key: &[u8]) -> Option<(String, String, String)> {
    let mut parts = key.splitn(3, |b| *b == KEY_SEPARATOR);
    let source_id = std::str::from_utf8(parts.next()?).ok()?;
    let schema = std::str::from_utf8(parts.next()?).ok()?;
    let table = std::str::from_utf8(parts.next()?).ok()?;
    if table.as_bytes().contains(&KEY_SEPARATOR) {
        return None;
    }
    Some((source_id.to_string(), schema.to_string(), table.to_string()))
}
