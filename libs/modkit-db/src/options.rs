//! Typed connection options built from [`DbConnConfig`].

use crate::config::{DbConnConfig, PoolCfg};
use crate::{DbEngine, DbError, DbHandle, Result};
use std::path::Path;
use std::sync::OnceLock;

/// Database connection options using typed sqlx ConnectOptions.
#[derive(Debug, Clone)]
pub enum DbConnectOptions {
    #[cfg(feature = "sqlite")]
    Sqlite {
        opts: sqlx::sqlite::SqliteConnectOptions,
        in_memory: bool,
    },
    #[cfg(feature = "pg")]
    Postgres(sqlx::postgres::PgConnectOptions),
}

impl std::fmt::Display for DbConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnectOptions::Sqlite { opts, in_memory } => {
                if *in_memory {
                    write!(f, "sqlite::memory:")
                } else {
                    write!(f, "sqlite://{}", opts.get_filename().display())
                }
            }
            #[cfg(feature = "pg")]
            DbConnectOptions::Postgres(opts) => write!(
                f,
                "postgresql://<redacted>@{}:{}/{}",
                opts.get_host(),
                opts.get_port(),
                opts.get_database().unwrap_or("")
            ),
            #[cfg(not(any(feature = "sqlite", feature = "pg")))]
            _ => unreachable!("No database features enabled"),
        }
    }
}

impl DbConnectOptions {
    pub fn engine(&self) -> DbEngine {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnectOptions::Sqlite { .. } => DbEngine::Sqlite,
            #[cfg(feature = "pg")]
            DbConnectOptions::Postgres(_) => DbEngine::Postgres,
            #[cfg(not(any(feature = "sqlite", feature = "pg")))]
            _ => unreachable!("No database features enabled"),
        }
    }

    /// Connect to the database using the configured options.
    pub async fn connect(&self, pool: &PoolCfg) -> Result<DbHandle> {
        let dsn = self.to_string();
        match self {
            #[cfg(feature = "sqlite")]
            DbConnectOptions::Sqlite { opts, in_memory } => {
                let mut pool_opts = sqlx::sqlite::SqlitePoolOptions::new();
                if *in_memory {
                    // Every connection to :memory: is a separate database; keep exactly one alive.
                    pool_opts = pool_opts
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None);
                } else {
                    pool_opts = pool.apply(pool_opts);
                }
                let sqlx_pool = pool_opts.connect_with(opts.clone()).await?;
                let sea = sea_orm::SqlxSqliteConnector::from_sqlx_sqlite_pool(sqlx_pool);
                Ok(DbHandle::new(DbEngine::Sqlite, dsn, sea))
            }
            #[cfg(feature = "pg")]
            DbConnectOptions::Postgres(opts) => {
                let pool_opts = pool.apply(sqlx::postgres::PgPoolOptions::new());
                let sqlx_pool = pool_opts.connect_with(opts.clone()).await?;
                let sea = sea_orm::SqlxPostgresConnector::from_sqlx_postgres_pool(sqlx_pool);
                Ok(DbHandle::new(DbEngine::Postgres, dsn, sea))
            }
            #[cfg(not(any(feature = "sqlite", feature = "pg")))]
            _ => Err(DbError::FeatureDisabled("no database backends enabled")),
        }
    }
}

/// Build a database handle from configuration.
///
/// `home_dir` anchors relative SQLite paths (`file`, relative `path`, relative DSN paths).
pub async fn build_db_handle(mut cfg: DbConnConfig, home_dir: &Path) -> Result<DbHandle> {
    if let Some(dsn) = &cfg.dsn {
        cfg.dsn = Some(expand_env_vars(dsn)?);
    }
    if let Some(password) = &cfg.password {
        cfg.password = Some(resolve_password(password)?);
    }

    validate_config_consistency(&cfg)?;

    let options = build_connect_options(&cfg, home_dir)?;
    let pool = cfg.pool.clone().unwrap_or_default();

    tracing::debug!(engine = ?options.engine(), dsn = %options, "Connecting to database");
    let handle = options.connect(&pool).await?;
    tracing::info!(
        engine = ?handle.engine(),
        dsn = %handle.dsn(),
        "Database handle ready"
    );
    Ok(handle)
}

/// Build typed connect options, deciding the engine from DSN scheme or fields.
pub fn build_connect_options(cfg: &DbConnConfig, home_dir: &Path) -> Result<DbConnectOptions> {
    let engine = match &cfg.dsn {
        Some(dsn) => DbHandle::detect(dsn)?,
        None if cfg.file.is_some() || cfg.path.is_some() => DbEngine::Sqlite,
        None if cfg.host.is_some() || cfg.dbname.is_some() => DbEngine::Postgres,
        None => {
            return Err(DbError::InvalidParameter(
                "database requires either dsn, file/path, or host/dbname".to_string(),
            ))
        }
    };

    match engine {
        DbEngine::Sqlite => build_sqlite_options(cfg, home_dir),
        DbEngine::Postgres => build_pg_options(cfg),
    }
}

fn build_sqlite_options(cfg: &DbConnConfig, home_dir: &Path) -> Result<DbConnectOptions> {
    #[cfg(feature = "sqlite")]
    {
        use crate::sqlite::{self, Pragmas};
        use sqlx::sqlite::SqliteConnectOptions;
        use std::str::FromStr;

        let (mut opts, dsn_pragmas, in_memory) = if let Some(dsn) = &cfg.dsn {
            let (clean, query_pragmas) = sqlite::split_pragmas_from_dsn(dsn);
            let in_memory = sqlite::is_memory_dsn(&clean);
            let clean = if in_memory {
                clean
            } else {
                sqlite::absolutize_sqlite_dsn(&clean, home_dir, true)?
            };
            let opts = SqliteConnectOptions::from_str(&clean)
                .map_err(|e| DbError::InvalidParameter(e.to_string()))?;
            (opts, Pragmas::from_dsn_params(&query_pragmas), in_memory)
        } else {
            let path = sqlite::resolve_sqlite_file(cfg, home_dir)?;
            let opts = SqliteConnectOptions::new().filename(path);
            (opts, Pragmas::default(), false)
        };

        opts = opts.create_if_missing(true).foreign_keys(true);

        let param_pragmas = match &cfg.params {
            Some(params) => Pragmas::from_params(params)?,
            None => Pragmas::default(),
        };
        let pragmas = dsn_pragmas.overridden_by(param_pragmas);
        opts = pragmas.apply(opts, in_memory);

        Ok(DbConnectOptions::Sqlite { opts, in_memory })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        Err(DbError::FeatureDisabled("SQLite feature not enabled"))
    }
}

fn build_pg_options(cfg: &DbConnConfig) -> Result<DbConnectOptions> {
    #[cfg(feature = "pg")]
    {
        let mut opts = match &cfg.dsn {
            Some(dsn) => dsn
                .parse::<sqlx::postgres::PgConnectOptions>()
                .map_err(|e| DbError::InvalidParameter(e.to_string()))?,
            None => sqlx::postgres::PgConnectOptions::new(),
        };

        if let Some(host) = &cfg.host {
            opts = opts.host(host);
        }
        if let Some(port) = cfg.port {
            opts = opts.port(port);
        }
        if let Some(user) = &cfg.user {
            opts = opts.username(user);
        }
        if let Some(password) = &cfg.password {
            opts = opts.password(password);
        }
        if let Some(dbname) = &cfg.dbname {
            opts = opts.database(dbname);
        } else if cfg.dsn.is_none() {
            return Err(DbError::InvalidParameter(
                "dbname is required for PostgreSQL connections".to_string(),
            ));
        }
        if let Some(params) = &cfg.params {
            for (key, value) in params {
                opts = opts.options([(key.as_str(), value.as_str())]);
            }
        }

        Ok(DbConnectOptions::Postgres(opts))
    }
    #[cfg(not(feature = "pg"))]
    {
        let _ = cfg;
        Err(DbError::FeatureDisabled("PostgreSQL feature not enabled"))
    }
}

fn env_var_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
    })
}

/// Expand `${VAR}` references from the process environment.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    for caps in env_var_pattern().captures_iter(input) {
        let name = &caps[1];
        let value = std::env::var(name).map_err(|source| DbError::EnvVar {
            name: name.to_string(),
            source,
        })?;
        result = result.replace(&caps[0], &value);
    }
    Ok(result)
}

/// Resolve password from environment variable if it is exactly `${VAR}`.
fn resolve_password(password: &str) -> Result<String> {
    match password
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(name) => std::env::var(name).map_err(|source| DbError::EnvVar {
            name: name.to_string(),
            source,
        }),
        None => Ok(password.to_string()),
    }
}

/// Validate configuration for consistency and detect conflicts.
pub fn validate_config_consistency(cfg: &DbConnConfig) -> Result<()> {
    let has_sqlite_fields = cfg.file.is_some() || cfg.path.is_some();
    let has_server_fields = cfg.host.is_some() || cfg.port.is_some();

    if let Some(dsn) = &cfg.dsn {
        let is_sqlite_dsn = dsn.trim_start().starts_with("sqlite");

        if is_sqlite_dsn && has_server_fields {
            return Err(DbError::ConfigConflict(
                "SQLite DSN cannot be used with host/port fields".to_string(),
            ));
        }
        if !is_sqlite_dsn && has_sqlite_fields {
            return Err(DbError::ConfigConflict(
                "Non-SQLite DSN cannot be used with file/path fields".to_string(),
            ));
        }
        if is_sqlite_dsn && has_sqlite_fields {
            return Err(DbError::ConfigConflict(
                "SQLite DSN cannot be combined with file/path fields".to_string(),
            ));
        }
    }

    if cfg.file.is_some() && cfg.path.is_some() {
        return Err(DbError::ConfigConflict(
            "Cannot specify both 'file' and 'path' for SQLite - use one or the other".to_string(),
        ));
    }

    if has_sqlite_fields && has_server_fields {
        return Err(DbError::ConfigConflict(
            "SQLite file/path fields cannot be used with host/port fields".to_string(),
        ));
    }

    Ok(())
}

/// Redact credentials from DSN for logging.
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => match url::Url::parse(dsn) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "***".to_string(),
        },
        Some(dsn) => dsn.to_string(),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_password_only() {
        let out = redact_credentials_in_dsn(Some("postgres://app:s3cret@db:5432/accounts"));
        assert_eq!(out, "postgres://app:***@db:5432/accounts");
        assert_eq!(
            redact_credentials_in_dsn(Some("sqlite://accounts.db")),
            "sqlite://accounts.db"
        );
        assert_eq!(redact_credentials_in_dsn(None), "none");
    }

    #[test]
    fn expands_env_vars_and_reports_missing_ones() {
        std::env::set_var("MODKIT_DB_TEST_HOST", "db.internal");
        let out = expand_env_vars("postgres://u@${MODKIT_DB_TEST_HOST}/app").unwrap();
        assert_eq!(out, "postgres://u@db.internal/app");

        let err = expand_env_vars("postgres://u@${MODKIT_DB_TEST_UNSET_VAR}/app").unwrap_err();
        assert!(matches!(err, DbError::EnvVar { ref name, .. } if name == "MODKIT_DB_TEST_UNSET_VAR"));
    }

    #[test]
    fn resolves_password_placeholder() {
        std::env::set_var("MODKIT_DB_TEST_PASSWORD", "hunter2");
        assert_eq!(
            resolve_password("${MODKIT_DB_TEST_PASSWORD}").unwrap(),
            "hunter2"
        );
        assert_eq!(resolve_password("plain").unwrap(), "plain");
    }

    #[test]
    fn detects_conflicts() {
        let cfg = DbConnConfig {
            dsn: Some("sqlite://a.db".into()),
            host: Some("localhost".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_config_consistency(&cfg),
            Err(DbError::ConfigConflict(_))
        ));

        let cfg = DbConnConfig {
            file: Some("a.db".into()),
            path: Some("/tmp/a.db".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_config_consistency(&cfg),
            Err(DbError::ConfigConflict(_))
        ));

        let cfg = DbConnConfig {
            dsn: Some("postgres://localhost/app".into()),
            file: Some("a.db".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_config_consistency(&cfg),
            Err(DbError::ConfigConflict(_))
        ));

        let cfg = DbConnConfig {
            host: Some("localhost".into()),
            dbname: Some("app".into()),
            ..Default::default()
        };
        assert!(validate_config_consistency(&cfg).is_ok());
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = build_connect_options(&DbConnConfig::default(), Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, DbError::InvalidParameter(_)));
    }
}
