use std::sync::Arc;

use modkit_db::DbHandle;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::config::AccountsConfig;
use crate::contract::client::AccountsApi;
use crate::domain::ports::{AccountsStore, OutcomeSink};
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::AccountsLocalClient;
use crate::infra::outcome::TracingOutcomeSink;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::SeaOrmAccountsStore;

/// Wires the SeaORM store and the tracing outcome sink into the domain service.
#[derive(Clone)]
pub struct Accounts {
    service: Arc<Service>,
}

impl Accounts {
    /// Initialize the module on an open store handle.
    pub async fn init(db: &DbHandle, cfg: &AccountsConfig) -> anyhow::Result<Self> {
        info!("Initializing accounts module");
        debug!(
            dry_run = cfg.dry_run,
            auto_migrate = cfg.auto_migrate,
            "Loaded accounts config"
        );

        if cfg.auto_migrate {
            migrate(db).await?;
        }

        let store = SeaOrmAccountsStore::new(db.sea());
        Ok(Self::from_parts(
            Arc::new(store),
            Arc::new(TracingOutcomeSink),
            cfg.service_config(),
        ))
    }

    /// Build from explicit ports (used by tests and alternative stores).
    pub fn from_parts(
        store: Arc<dyn AccountsStore>,
        outcomes: Arc<dyn OutcomeSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            service: Arc::new(Service::new(store, outcomes, config)),
        }
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// Local in-process client.
    pub fn client(&self) -> Arc<dyn AccountsApi> {
        Arc::new(AccountsLocalClient::new(self.service.clone()))
    }
}

/// Apply all pending schema migrations.
pub async fn migrate(db: &DbHandle) -> anyhow::Result<()> {
    info!("Running accounts database migrations");
    Migrator::up(db.seaorm(), None).await?;
    info!("Accounts database migrations completed successfully");
    Ok(())
}
