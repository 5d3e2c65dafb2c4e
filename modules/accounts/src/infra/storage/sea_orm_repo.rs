//! SeaORM-backed implementation of the store port.
//!
//! `SeaOrmAccountsStore` is generic over `C: TransactionTrait`, so it can be
//! built on a `DatabaseConnection` **or** on an outer transaction (each
//! operation then runs in a savepoint).

use anyhow::Context;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr, EntityTrait,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};

use crate::contract::model::{Group, GroupMember, NewProfile};
use crate::domain::ports::{AccountsStore, AccountsTx, InsertOutcome};
use crate::infra::storage::entity::{group, group_member, user, user_profile};

/// SeaORM store impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmAccountsStore<C>
where
    C: TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmAccountsStore<C>
where
    C: TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> AccountsStore for SeaOrmAccountsStore<C>
where
    C: TransactionTrait + Send + Sync + 'static,
{
    async fn begin(&self) -> anyhow::Result<Box<dyn AccountsTx>> {
        let txn = self
            .conn
            .begin()
            .await
            .context("begin transaction failed")?;
        if txn.get_database_backend() == DatabaseBackend::Sqlite {
            // SQLite opens deferred transactions: a pass that scanned under a
            // read snapshot cannot upgrade once another writer has committed
            // (SQLITE_BUSY_SNAPSHOT). Taking the write lock before the first
            // read makes a competing pass wait on busy_timeout instead.
            txn.execute_unprepared(SQLITE_WRITE_LOCK)
                .await
                .context("acquire SQLite write lock failed")?;
        }
        Ok(Box::new(SeaOrmAccountsTx { txn }))
    }
}

/// Zero-row write; any UPDATE takes the database write lock when it starts.
const SQLITE_WRITE_LOCK: &str = "UPDATE users SET id = id WHERE 1 = 0";

/// One open transaction. Dropping it without `commit` rolls it back.
pub struct SeaOrmAccountsTx {
    txn: DatabaseTransaction,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait::async_trait]
impl AccountsTx for SeaOrmAccountsTx {
    async fn users_without_profile(&self) -> anyhow::Result<Vec<i64>> {
        // users LEFT JOIN user_profiles ... WHERE user_profiles.id IS NULL
        let ids = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .join(JoinType::LeftJoin, user::Relation::Profile.def())
            .filter(user_profile::Column::Id.is_null())
            .order_by_asc(user::Column::Id)
            .into_tuple::<i64>()
            .all(&self.txn)
            .await
            .context("users_without_profile failed")?;
        Ok(ids)
    }

    async fn insert_profile(&self, profile: NewProfile) -> anyhow::Result<InsertOutcome> {
        let user_id = profile.user_id;
        let m = user_profile::ActiveModel {
            user_id: Set(profile.user_id),
            timezone: Set(profile.timezone),
            language: Set(profile.language),
            theme: Set(profile.theme),
            created_at: Set(profile.created_at),
            updated_at: Set(profile.updated_at),
            ..Default::default()
        };

        // DO NOTHING keeps a lost race from aborting the enclosing transaction.
        let res = user_profile::Entity::insert(m)
            .on_conflict(
                OnConflict::column(user_profile::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await;

        match res {
            Ok(0) => Ok(InsertOutcome::AlreadyExists),
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::AlreadyExists),
            Err(e) => Err(e).with_context(|| format!("insert_profile failed for user {user_id}")),
        }
    }

    async fn find_group_by_name(&self, name: &str) -> anyhow::Result<Option<Group>> {
        let found = group::Entity::find()
            .filter(group::Column::Name.eq(name))
            .one(&self.txn)
            .await
            .with_context(|| format!("find_group_by_name failed for '{name}'"))?;
        Ok(found.map(Into::into))
    }

    async fn list_group_members(&self, group_id: i64) -> anyhow::Result<Vec<GroupMember>> {
        let rows = group_member::Entity::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by_asc(group_member::Column::Id)
            .all(&self.txn)
            .await
            .with_context(|| format!("list_group_members failed for group {group_id}"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_group_member(&self, member_id: i64) -> anyhow::Result<bool> {
        let res = group_member::Entity::delete_by_id(member_id)
            .exec(&self.txn)
            .await
            .with_context(|| format!("delete_group_member failed for membership {member_id}"))?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_group(&self, group_id: i64) -> anyhow::Result<bool> {
        let res = group::Entity::delete_by_id(group_id)
            .exec(&self.txn)
            .await
            .with_context(|| format!("delete_group failed for group {group_id}"))?;
        Ok(res.rows_affected > 0)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.txn.commit().await.context("commit failed")
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.txn.rollback().await.context("rollback failed")
    }
}
