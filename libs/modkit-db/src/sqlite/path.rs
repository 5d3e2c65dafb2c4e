//! SQLite path preparation utilities.

use crate::{DbConnConfig, DbError, Result};
use std::path::{Path, PathBuf};

/// Expand a file-based sqlite DSN into an absolute-path DSN using a base directory.
/// Normalizes backslashes into forward slashes (important on Windows).
pub(crate) fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .ok_or_else(|| DbError::InvalidParameter(format!("DSN must start with sqlite: (got: {dsn})")))?;

    let (path_str, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };

    if path_str.is_empty() {
        return Err(DbError::InvalidParameter("Empty SQLite path in DSN".to_string()));
    }

    let path = anchor(PathBuf::from(path_str), base_dir, create_dirs)?;

    let mut out = String::from("sqlite://");
    out.push_str(&path.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Resolve the `file` / `path` fields of a config into an absolute database path.
pub(crate) fn resolve_sqlite_file(cfg: &DbConnConfig, base_dir: &Path) -> Result<PathBuf> {
    let raw = match (&cfg.file, &cfg.path) {
        (Some(file), None) => PathBuf::from(file),
        (None, Some(path)) => path.clone(),
        _ => {
            return Err(DbError::InvalidParameter(
                "SQLite connection requires exactly one of 'file' or 'path'".to_string(),
            ))
        }
    };
    anchor(raw, base_dir, true)
}

fn anchor(path: PathBuf, base_dir: &Path, create_dirs: bool) -> Result<PathBuf> {
    let path = if path.is_relative() {
        base_dir.join(path)
    } else {
        path
    };
    if create_dirs {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(path)
}
