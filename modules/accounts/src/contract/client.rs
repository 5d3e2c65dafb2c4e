use async_trait::async_trait;

use crate::contract::{
    error::AccountsError,
    model::{GroupDeletion, ProvisionReport},
};

/// Public API trait for the accounts module that other modules can use
#[async_trait]
pub trait AccountsApi: Send + Sync {
    /// Give every user without a profile a default one.
    async fn reconcile_profiles(&self) -> Result<ProvisionReport, AccountsError>;

    /// Delete a group and all of its memberships in one transaction.
    async fn delete_group_by_name(&self, name: &str) -> Result<GroupDeletion, AccountsError>;
}
