//! SQLite PRAGMA parameter handling with typed enums.

use crate::{DbError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_SQLITE_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// SQLite journal mode options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JournalMode {
    Delete,
    Wal,
    Memory,
    Truncate,
    Persist,
    Off,
}

impl JournalMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DELETE" => Some(JournalMode::Delete),
            "WAL" => Some(JournalMode::Wal),
            "MEMORY" => Some(JournalMode::Memory),
            "TRUNCATE" => Some(JournalMode::Truncate),
            "PERSIST" => Some(JournalMode::Persist),
            "OFF" => Some(JournalMode::Off),
            _ => None,
        }
    }

    fn to_sqlx(self) -> SqliteJournalMode {
        match self {
            JournalMode::Delete => SqliteJournalMode::Delete,
            JournalMode::Wal => SqliteJournalMode::Wal,
            JournalMode::Memory => SqliteJournalMode::Memory,
            JournalMode::Truncate => SqliteJournalMode::Truncate,
            JournalMode::Persist => SqliteJournalMode::Persist,
            JournalMode::Off => SqliteJournalMode::Off,
        }
    }
}

/// SQLite synchronous mode options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SyncMode {
    Off,
    Normal,
    Full,
    Extra,
}

impl SyncMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OFF" => Some(SyncMode::Off),
            "NORMAL" => Some(SyncMode::Normal),
            "FULL" => Some(SyncMode::Full),
            "EXTRA" => Some(SyncMode::Extra),
            _ => None,
        }
    }

    fn to_sqlx(self) -> SqliteSynchronous {
        match self {
            SyncMode::Off => SqliteSynchronous::Off,
            SyncMode::Normal => SqliteSynchronous::Normal,
            SyncMode::Full => SqliteSynchronous::Full,
            SyncMode::Extra => SqliteSynchronous::Extra,
        }
    }
}

/// Parsed SQLite PRAGMA parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<JournalMode>,
    pub synchronous: Option<SyncMode>,
    pub busy_timeout: Option<Duration>,
}

#[derive(Clone, Copy)]
enum Strictness {
    /// Config `params`: unknown keys and bad values are errors.
    Strict,
    /// DSN query: bad values are logged and ignored.
    Lenient,
}

impl Pragmas {
    /// Parse the `params` map of a connection config. Only whitelisted keys are accepted.
    pub(crate) fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        Self::parse(params, Strictness::Strict)
    }

    /// Parse PRAGMA pairs split out of a DSN query string.
    pub(crate) fn from_dsn_params(params: &HashMap<String, String>) -> Self {
        // Lenient parsing never fails.
        Self::parse(params, Strictness::Lenient).unwrap_or_default()
    }

    fn parse(params: &HashMap<String, String>, mode: Strictness) -> Result<Self> {
        let mut pragmas = Pragmas::default();

        for (key, value) in params {
            let key_lower = key.to_lowercase();
            let parsed: std::result::Result<(), String> = match key_lower.as_str() {
                "journal_mode" => JournalMode::parse(value)
                    .map(|m| pragmas.journal_mode = Some(m))
                    .ok_or_else(|| "must be DELETE/WAL/MEMORY/TRUNCATE/PERSIST/OFF".to_string()),
                // Legacy toggle: wal=true|false|1|0
                "wal" => match value.to_lowercase().as_str() {
                    "true" | "1" => {
                        pragmas.journal_mode = Some(JournalMode::Wal);
                        Ok(())
                    }
                    "false" | "0" => {
                        pragmas.journal_mode = Some(JournalMode::Delete);
                        Ok(())
                    }
                    _ => Err("must be true/false/1/0".to_string()),
                },
                "synchronous" => SyncMode::parse(value)
                    .map(|m| pragmas.synchronous = Some(m))
                    .ok_or_else(|| "must be OFF/NORMAL/FULL/EXTRA".to_string()),
                "busy_timeout" => match value.parse::<u64>() {
                    Ok(ms) => {
                        pragmas.busy_timeout = Some(Duration::from_millis(ms));
                        Ok(())
                    }
                    Err(_) => Err("must be a non-negative integer (milliseconds)".to_string()),
                },
                _ => match mode {
                    Strictness::Strict => return Err(DbError::UnknownSqlitePragma(key.clone())),
                    Strictness::Lenient => {
                        tracing::debug!(key = %key, "Unknown SQLite parameter, ignoring");
                        Ok(())
                    }
                },
            };

            if let Err(message) = parsed {
                match mode {
                    Strictness::Strict => {
                        return Err(DbError::InvalidSqlitePragma {
                            key: key_lower,
                            message: format!("{message}, got '{value}'"),
                        })
                    }
                    Strictness::Lenient => {
                        tracing::warn!(key = %key_lower, value = %value, "{message}; ignoring");
                    }
                }
            }
        }

        Ok(pragmas)
    }

    /// Fields set in `other` win over fields set in `self`.
    pub(crate) fn overridden_by(self, other: Pragmas) -> Pragmas {
        Pragmas {
            journal_mode: other.journal_mode.or(self.journal_mode),
            synchronous: other.synchronous.or(self.synchronous),
            busy_timeout: other.busy_timeout.or(self.busy_timeout),
        }
    }

    /// Apply to connect options, filling defaults: WAL for files (DELETE for
    /// in-memory databases), NORMAL sync, 5s busy timeout.
    pub(crate) fn apply(self, opts: SqliteConnectOptions, in_memory: bool) -> SqliteConnectOptions {
        let journal = self.journal_mode.unwrap_or(if in_memory {
            JournalMode::Delete
        } else {
            JournalMode::Wal
        });
        opts.journal_mode(journal.to_sqlx())
            .synchronous(self.synchronous.unwrap_or(SyncMode::Normal).to_sqlx())
            .busy_timeout(self.busy_timeout.unwrap_or(DEFAULT_SQLITE_BUSY_TIMEOUT))
    }
}
