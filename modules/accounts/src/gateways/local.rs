use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::AccountsApi,
    error::AccountsError,
    model::{GroupDeletion, ProvisionReport},
};
use crate::domain::service::Service;

/// Local implementation of the AccountsApi trait that delegates to the domain service
pub struct AccountsLocalClient {
    service: Arc<Service>,
}

impl AccountsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AccountsApi for AccountsLocalClient {
    async fn reconcile_profiles(&self) -> Result<ProvisionReport, AccountsError> {
        self.service.reconcile_profiles().await.map_err(Into::into)
    }

    async fn delete_group_by_name(&self, name: &str) -> Result<GroupDeletion, AccountsError> {
        self.service
            .delete_group_by_name(name)
            .await
            .map_err(Into::into)
    }
}
