//! Tests for SQLite-specific connection behavior.
#![cfg(feature = "sqlite")]

use modkit_db::{build_db_handle, DbConnConfig, DbEngine, DbError, PoolCfg};
use sea_orm::{ConnectionTrait, DbBackend, Statement, TransactionTrait};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

async fn scalar_string(db: &sea_orm::DatabaseConnection, sql: &str) -> String {
    let row = db
        .query_one(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
        .await
        .unwrap()
        .expect("pragma returns a row");
    row.try_get_by_index::<String>(0).unwrap()
}

async fn scalar_i64(db: &sea_orm::DatabaseConnection, sql: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
        .await
        .unwrap()
        .expect("query returns a row");
    row.try_get_by_index::<i64>(0).unwrap()
}

/// `file` is resolved under the home directory and created on first connect.
#[tokio::test]
async fn test_sqlite_file_resolved_under_home() {
    let home = TempDir::new().unwrap();
    let cfg = DbConnConfig {
        file: Some("data/accounts.db".to_string()),
        ..Default::default()
    };

    let db = build_db_handle(cfg, home.path()).await.unwrap();
    assert_eq!(db.engine(), DbEngine::Sqlite);
    assert!(home.path().join("data/accounts.db").exists());
    db.close().await.unwrap();
}

/// Relative DSN paths are anchored to the home directory, not the cwd.
#[tokio::test]
async fn test_sqlite_relative_dsn_anchored_to_home() {
    let home = TempDir::new().unwrap();
    let cfg = DbConnConfig {
        dsn: Some("sqlite://db/rel.sqlite?wal=true".to_string()),
        ..Default::default()
    };

    let db = build_db_handle(cfg, home.path()).await.unwrap();
    assert!(home.path().join("db/rel.sqlite").exists());
    assert_eq!(scalar_string(db.seaorm(), "PRAGMA journal_mode").await, "wal");
}

/// Foreign keys are enforced on every pooled connection.
#[tokio::test]
async fn test_sqlite_foreign_keys_enabled() {
    let home = TempDir::new().unwrap();
    let cfg = DbConnConfig {
        file: Some("fk.db".to_string()),
        ..Default::default()
    };
    let db = build_db_handle(cfg, home.path()).await.unwrap();
    assert_eq!(scalar_i64(db.seaorm(), "PRAGMA foreign_keys").await, 1);
}

/// Config `params` override DSN pragmas.
#[tokio::test]
async fn test_sqlite_params_override_dsn() {
    let home = TempDir::new().unwrap();
    let mut params = HashMap::new();
    params.insert("journal_mode".to_string(), "DELETE".to_string());
    params.insert("busy_timeout".to_string(), "1234".to_string());

    let cfg = DbConnConfig {
        dsn: Some("sqlite://override.db?journal_mode=WAL".to_string()),
        params: Some(params),
        ..Default::default()
    };
    let db = build_db_handle(cfg, home.path()).await.unwrap();
    assert_eq!(
        scalar_string(db.seaorm(), "PRAGMA journal_mode").await,
        "delete"
    );
    assert_eq!(scalar_i64(db.seaorm(), "PRAGMA busy_timeout").await, 1234);
}

/// Unknown keys in `params` are rejected before connecting.
#[tokio::test]
async fn test_sqlite_unknown_param_rejected() {
    let home = TempDir::new().unwrap();
    let mut params = HashMap::new();
    params.insert("cache_size".to_string(), "100".to_string());
    let cfg = DbConnConfig {
        file: Some("bad.db".to_string()),
        params: Some(params),
        ..Default::default()
    };
    let err = build_db_handle(cfg, home.path()).await.unwrap_err();
    assert!(matches!(err, DbError::UnknownSqlitePragma(_)));
}

/// In-memory databases keep their single connection, so data survives across statements.
#[tokio::test]
async fn test_sqlite_memory_survives_between_statements() {
    let cfg = DbConnConfig {
        dsn: Some("sqlite::memory:".to_string()),
        pool: Some(PoolCfg {
            max_conns: Some(8),
            ..Default::default()
        }),
        ..Default::default()
    };
    let db = build_db_handle(cfg, std::path::Path::new(".")).await.unwrap();
    let conn = db.seaorm();
    conn.execute_unprepared("CREATE TABLE t (id INTEGER PRIMARY KEY)")
        .await
        .unwrap();
    conn.execute_unprepared("INSERT INTO t (id) VALUES (1)")
        .await
        .unwrap();
    assert_eq!(scalar_i64(conn, "SELECT COUNT(*) FROM t").await, 1);
}

/// A dropped transaction rolls back.
#[tokio::test]
async fn test_uncommitted_transaction_rolls_back_on_drop() {
    let home = TempDir::new().unwrap();
    let cfg = DbConnConfig {
        file: Some("tx.db".to_string()),
        pool: Some(PoolCfg {
            max_conns: Some(2),
            acquire_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        }),
        ..Default::default()
    };
    let db = build_db_handle(cfg, home.path()).await.unwrap();
    db.seaorm()
        .execute_unprepared("CREATE TABLE t (id INTEGER PRIMARY KEY)")
        .await
        .unwrap();

    {
        let txn = db.begin().await.unwrap();
        txn.execute_unprepared("INSERT INTO t (id) VALUES (1)")
            .await
            .unwrap();
        // dropped without commit
    }

    let txn = db.seaorm().begin().await.unwrap();
    txn.execute_unprepared("INSERT INTO t (id) VALUES (2)")
        .await
        .unwrap();
    txn.commit().await.unwrap();

    assert_eq!(scalar_i64(db.seaorm(), "SELECT COUNT(*) FROM t").await, 1);
    assert_eq!(scalar_i64(db.seaorm(), "SELECT MIN(id) FROM t").await, 2);
}
