#![cfg_attr(
    not(any(feature = "pg", feature = "sqlite")),
    allow(unused_imports, unused_variables, dead_code, unreachable_code)
)]

//! ModKit Database abstraction crate.
//!
//! This crate is the store access layer used by the account maintenance
//! modules. It builds a pooled connection (SQLite or PostgreSQL, through SQLx)
//! from typed configuration and exposes it as a SeaORM [`DatabaseConnection`].
//! Scoped transactions are acquired through [`DbHandle::begin`]; the returned
//! SeaORM transaction rolls back when dropped without a commit.
//!
//! # Features
//! - `pg`, `sqlite`: enable SQLx backends (and the matching SeaORM drivers)
//!
//! # Example
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> modkit_db::Result<()> {
//!     use modkit_db::{DbHandle, PoolCfg};
//!
//!     let db = DbHandle::connect("sqlite://./accounts.db", PoolCfg::default()).await?;
//!     let txn = db.begin().await?;
//!     // ... run statements against `&txn` ...
//!     txn.commit().await?;
//!     db.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod options;
#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;

pub use config::{DbConnConfig, PoolCfg};
pub use options::{build_db_handle, redact_credentials_in_dsn, DbConnectOptions};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::path::Path;
use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid connection parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration conflict: {0}")]
    ConfigConflict(String),

    #[error("Unknown SQLite PRAGMA parameter: {0}")]
    UnknownSqlitePragma(String),

    #[error("Invalid SQLite PRAGMA parameter '{key}': {message}")]
    InvalidSqlitePragma { key: String, message: String },

    #[error("Environment variable '{name}' is not available: {source}")]
    EnvVar {
        name: String,
        #[source]
        source: std::env::VarError,
    },

    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Main handle: a pooled connection plus the redacted DSN it was built from.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    pub(crate) fn new(engine: DbEngine, dsn: String, sea: DatabaseConnection) -> Self {
        Self { engine, dsn, sea }
    }

    /// Detect engine by DSN.
    ///
    /// Note: we only check scheme prefixes and don't mutate the tail (credentials etc.).
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials_in_dsn(Some(dsn))))
        }
    }

    /// Connect to a DSN with explicit pool settings.
    /// Relative SQLite paths are resolved against the current directory.
    pub async fn connect(dsn: &str, pool: PoolCfg) -> Result<Self> {
        let cfg = DbConnConfig {
            dsn: Some(dsn.to_string()),
            pool: Some(pool),
            ..Default::default()
        };
        build_db_handle(cfg, Path::new(".")).await
    }

    /// Get the backend.
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Get the DSN used for this connection, with credentials redacted.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Get SeaORM connection (clone; cheap handle).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    /// Borrow the SeaORM connection.
    pub fn seaorm(&self) -> &DatabaseConnection {
        &self.sea
    }

    /// Begin a scoped transaction.
    ///
    /// Dropping the transaction without calling `commit` rolls it back.
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.sea.begin().await?)
    }

    /// Round-trip to the store to verify the pool can hand out a connection.
    pub async fn ping(&self) -> Result<()> {
        self.sea.ping().await?;
        Ok(())
    }

    /// Graceful pool close. (Dropping the pool also closes it; this just makes it explicit.)
    pub async fn close(self) -> Result<()> {
        self.sea.close().await?;
        Ok(())
    }
}
