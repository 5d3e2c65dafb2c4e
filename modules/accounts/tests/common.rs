#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use accounts::contract::model::{Group, GroupMember, NewProfile};
use accounts::domain::events::AccountOutcome;
use accounts::domain::ports::{AccountsStore, AccountsTx, InsertOutcome, OutcomeSink};
use accounts::domain::service::{Service, ServiceConfig};
use accounts::infra::storage::entity::{group, group_member, user, user_profile};
use accounts::infra::storage::SeaOrmAccountsStore;
use anyhow::{bail, Result};
use chrono::Utc;
use modkit_db::{build_db_handle, DbConnConfig, DbHandle};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use tempfile::TempDir;
use tokio::sync::Barrier;

/// A migrated SQLite database in a scratch directory.
pub struct TestDb {
    pub db: DbHandle,
    _home: TempDir,
}

pub async fn setup() -> TestDb {
    let home = TempDir::new().expect("tempdir");
    let cfg = DbConnConfig {
        file: Some("accounts.db".to_string()),
        ..Default::default()
    };
    let db = build_db_handle(cfg, home.path())
        .await
        .expect("Failed to open test database");
    accounts::module::migrate(&db)
        .await
        .expect("Failed to run migrations");
    TestDb { db, _home: home }
}

// --- seeding ---

pub async fn seed_users(db: &DbHandle, ids: &[i64]) {
    for &id in ids {
        user::ActiveModel {
            id: Set(id),
            email: Set(format!("user{id}@example.com")),
            username: Set(format!("user{id}")),
            created_at: Set(Utc::now()),
        }
        .insert(db.seaorm())
        .await
        .expect("seed user");
    }
}

pub async fn seed_profile(db: &DbHandle, user_id: i64, theme: &str) {
    let now = Utc::now();
    user_profile::ActiveModel {
        user_id: Set(user_id),
        timezone: Set("Europe/Berlin".to_string()),
        language: Set("de".to_string()),
        theme: Set(theme.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db.seaorm())
    .await
    .expect("seed profile");
}

pub async fn seed_group(db: &DbHandle, id: i64, name: &str, members: &[i64]) {
    group::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        created_by: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db.seaorm())
    .await
    .expect("seed group");

    for (i, &user_id) in members.iter().enumerate() {
        group_member::ActiveModel {
            group_id: Set(id),
            user_id: Set(user_id),
            role: Set(if i == 0 { "owner" } else { "member" }.to_string()),
            joined_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db.seaorm())
        .await
        .expect("seed membership");
    }
}

// --- inspection ---

pub async fn profiles(db: &DbHandle) -> Vec<user_profile::Model> {
    user_profile::Entity::find()
        .order_by_asc(user_profile::Column::UserId)
        .all(db.seaorm())
        .await
        .expect("load profiles")
}

pub async fn profile_user_ids(db: &DbHandle) -> Vec<i64> {
    profiles(db).await.into_iter().map(|p| p.user_id).collect()
}

pub async fn groups(db: &DbHandle) -> Vec<group::Model> {
    group::Entity::find()
        .order_by_asc(group::Column::Id)
        .all(db.seaorm())
        .await
        .expect("load groups")
}

pub async fn members(db: &DbHandle) -> Vec<group_member::Model> {
    group_member::Entity::find()
        .order_by_asc(group_member::Column::Id)
        .all(db.seaorm())
        .await
        .expect("load memberships")
}

pub async fn member_count(db: &DbHandle) -> u64 {
    group_member::Entity::find()
        .count(db.seaorm())
        .await
        .expect("count memberships")
}

// --- service wiring ---

/// Outcome sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<AccountOutcome>>,
}

impl RecordingSink {
    pub fn outcomes(&self) -> Vec<AccountOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl OutcomeSink for RecordingSink {
    fn record(&self, outcome: &AccountOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}

pub fn sea_store(db: &DbHandle) -> Arc<dyn AccountsStore> {
    Arc::new(SeaOrmAccountsStore::new(db.sea()))
}

pub fn service_with(
    store: Arc<dyn AccountsStore>,
    config: ServiceConfig,
) -> (Service, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (Service::new(store, sink.clone(), config), sink)
}

pub fn service(db: &DbHandle) -> (Service, Arc<RecordingSink>) {
    service_with(sea_store(db), ServiceConfig::default())
}

// --- fault injection ---

/// Store failures injected on top of the real SeaORM store.
#[derive(Clone, Debug)]
pub enum Fault {
    /// `delete_group` fails after all memberships were deleted.
    DeleteGroup,
    /// The n-th (0-based) profile insert fails.
    InsertProfile(usize),
    /// The anti-join also reports these users, as if their profile appeared
    /// after the scan (a concurrent provisioner won the race).
    StaleScan(Vec<i64>),
}

pub struct FaultyStore {
    inner: Arc<dyn AccountsStore>,
    fault: Fault,
}

impl FaultyStore {
    pub fn wrap(inner: Arc<dyn AccountsStore>, fault: Fault) -> Arc<dyn AccountsStore> {
        Arc::new(Self { inner, fault })
    }
}

#[async_trait::async_trait]
impl AccountsStore for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn AccountsTx>> {
        Ok(Box::new(FaultyTx {
            inner: self.inner.begin().await?,
            fault: self.fault.clone(),
            inserts: AtomicUsize::new(0),
        }))
    }
}

struct FaultyTx {
    inner: Box<dyn AccountsTx>,
    fault: Fault,
    inserts: AtomicUsize,
}

#[async_trait::async_trait]
impl AccountsTx for FaultyTx {
    async fn users_without_profile(&self) -> Result<Vec<i64>> {
        let mut ids = self.inner.users_without_profile().await?;
        if let Fault::StaleScan(extra) = &self.fault {
            ids.extend(extra.iter().copied());
            ids.sort_unstable();
            ids.dedup();
        }
        Ok(ids)
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<InsertOutcome> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fault, Fault::InsertProfile(at) if at == n) {
            bail!("injected fault: insert_profile #{n}");
        }
        self.inner.insert_profile(profile).await
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        self.inner.find_group_by_name(name).await
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        self.inner.list_group_members(group_id).await
    }

    async fn delete_group_member(&self, member_id: i64) -> Result<bool> {
        self.inner.delete_group_member(member_id).await
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        if matches!(self.fault, Fault::DeleteGroup) {
            bail!("injected fault: delete_group {group_id}");
        }
        self.inner.delete_group(group_id).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

// --- interleaving ---

/// Makes concurrent passes meet right after their anti-join scan, so both
/// scans see the same state when the store lets them overlap. A pass that is
/// held back by the store stops waiting after `patience`.
pub struct RendezvousStore {
    inner: Arc<dyn AccountsStore>,
    barrier: Arc<Barrier>,
    patience: Duration,
}

impl RendezvousStore {
    pub fn wrap(
        inner: Arc<dyn AccountsStore>,
        barrier: Arc<Barrier>,
        patience: Duration,
    ) -> Arc<dyn AccountsStore> {
        Arc::new(Self {
            inner,
            barrier,
            patience,
        })
    }
}

#[async_trait::async_trait]
impl AccountsStore for RendezvousStore {
    async fn begin(&self) -> Result<Box<dyn AccountsTx>> {
        Ok(Box::new(RendezvousTx {
            inner: self.inner.begin().await?,
            barrier: self.barrier.clone(),
            patience: self.patience,
        }))
    }
}

struct RendezvousTx {
    inner: Box<dyn AccountsTx>,
    barrier: Arc<Barrier>,
    patience: Duration,
}

#[async_trait::async_trait]
impl AccountsTx for RendezvousTx {
    async fn users_without_profile(&self) -> Result<Vec<i64>> {
        let ids = self.inner.users_without_profile().await?;
        let _ = tokio::time::timeout(self.patience, self.barrier.wait()).await;
        Ok(ids)
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<InsertOutcome> {
        self.inner.insert_profile(profile).await
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        self.inner.find_group_by_name(name).await
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        self.inner.list_group_members(group_id).await
    }

    async fn delete_group_member(&self, member_id: i64) -> Result<bool> {
        self.inner.delete_group_member(member_id).await
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        self.inner.delete_group(group_id).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}
