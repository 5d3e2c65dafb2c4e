//! SQLite DSN parsing and cleaning utilities.

use std::collections::HashMap;

/// Query keys that are SQLite PRAGMAs rather than driver options.
const SQLITE_PRAGMA_PARAMS: &[&str] = &["wal", "synchronous", "busy_timeout", "journal_mode"];

/// Split PRAGMA parameters out of a SQLite DSN.
///
/// Returns the DSN with PRAGMA keys removed (other query keys such as `mode`
/// are kept for the driver) and the extracted pairs with lowercase keys.
pub(crate) fn split_pragmas_from_dsn(dsn: &str) -> (String, HashMap<String, String>) {
    let Some((base, query)) = dsn.split_once('?') else {
        return (dsn.to_string(), HashMap::new());
    };

    let mut extracted = HashMap::new();
    let mut remaining = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let key_lower = key.to_lowercase();
        if SQLITE_PRAGMA_PARAMS.contains(&key_lower.as_str()) {
            extracted.insert(key_lower, value.into_owned());
        } else {
            remaining.push(format!("{key}={value}"));
        }
    }

    if remaining.is_empty() {
        (base.to_string(), extracted)
    } else {
        (format!("{base}?{}", remaining.join("&")), extracted)
    }
}

/// Check if the DSN represents an in-memory SQLite database.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    if dsn.contains(":memory:") {
        return true;
    }
    dsn.split_once('?').is_some_and(|(_, query)| {
        url::form_urlencoded::parse(query.as_bytes())
            .any(|(k, v)| k.eq_ignore_ascii_case("mode") && v.eq_ignore_ascii_case("memory"))
    })
}
