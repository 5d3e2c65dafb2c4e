use async_trait::async_trait;

use crate::contract::model::{Group, GroupMember, NewProfile};

/// Result of a profile insert that lost or won the `user_id` uniqueness race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Port for the domain layer: hands out one scoped transaction per operation.
#[async_trait]
pub trait AccountsStore: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn AccountsTx>>;
}

/// Persistence primitives the domain needs, all bound to one transaction.
///
/// Dropping a transaction without `commit` discards its writes.
#[async_trait]
pub trait AccountsTx: Send + Sync {
    /// Ids of users with no profile row, ascending.
    async fn users_without_profile(&self) -> anyhow::Result<Vec<i64>>;
    async fn insert_profile(&self, profile: NewProfile) -> anyhow::Result<InsertOutcome>;
    /// Exact, case-sensitive lookup.
    async fn find_group_by_name(&self, name: &str) -> anyhow::Result<Option<Group>>;
    async fn list_group_members(&self, group_id: i64) -> anyhow::Result<Vec<GroupMember>>;
    /// Returns true if a row was deleted.
    async fn delete_group_member(&self, member_id: i64) -> anyhow::Result<bool>;
    /// Returns true if a row was deleted.
    async fn delete_group(&self, group_id: i64) -> anyhow::Result<bool>;
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}
