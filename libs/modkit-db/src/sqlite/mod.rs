//! SQLite-specific helpers:
//! - DSN query splitting (PRAGMA keys vs. driver keys)
//! - path resolution against the application home directory
//! - PRAGMA parsing with a strict whitelist

pub(crate) mod dsn;
pub(crate) mod path;
pub(crate) mod pragmas;

pub(crate) use dsn::{is_memory_dsn, split_pragmas_from_dsn};
pub(crate) use path::{absolutize_sqlite_dsn, resolve_sqlite_file};
pub(crate) use pragmas::Pragmas;
