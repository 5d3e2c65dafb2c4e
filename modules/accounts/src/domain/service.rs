use std::sync::Arc;

use crate::contract::model::{
    GroupDeletion, GroupDeletionSummary, NewProfile, ProfileDefaults, ProvisionReport,
};
use crate::domain::error::DomainError;
use crate::domain::events::AccountOutcome;
use crate::domain::ports::{AccountsStore, AccountsTx, InsertOutcome, OutcomeSink};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

/// Domain service with the account maintenance operations.
/// Depends only on the store and outcome ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    store: Arc<dyn AccountsStore>,
    outcomes: Arc<dyn OutcomeSink>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Roll back every transaction instead of committing it.
    pub dry_run: bool,
    pub profile_defaults: ProfileDefaults,
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        store: Arc<dyn AccountsStore>,
        outcomes: Arc<dyn OutcomeSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            outcomes,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Same dependencies, different dry-run setting.
    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        let mut svc = self.clone();
        svc.config.dry_run = dry_run;
        svc
    }

    /// Give every user without a profile a profile with default settings.
    ///
    /// The whole pass runs in one transaction. Users whose profile was created
    /// concurrently are reported in `already_existed` instead of failing the pass.
    #[instrument(
        name = "accounts.service.reconcile_profiles",
        skip(self),
        fields(dry_run = self.config.dry_run)
    )]
    pub async fn reconcile_profiles(&self) -> Result<ProvisionReport, DomainError> {
        info!("Reconciling user profiles");

        match self.run_reconcile().await {
            Ok(report) => {
                self.outcomes.record(&AccountOutcome::ProfilesReconciled {
                    provisioned: report.provisioned.len(),
                    skipped: report.already_existed.len(),
                    dry_run: report.dry_run,
                    at: Utc::now(),
                });
                info!(
                    provisioned = report.provisioned.len(),
                    already_existed = report.already_existed.len(),
                    "Profile reconciliation finished"
                );
                Ok(report)
            }
            Err(e) => Err(self.failed("reconcile_profiles", e)),
        }
    }

    /// Delete the group called exactly `name` together with all its memberships.
    ///
    /// A missing group yields [`GroupDeletion::NotFound`] and performs no writes.
    #[instrument(
        name = "accounts.service.delete_group_by_name",
        skip(self),
        fields(dry_run = self.config.dry_run)
    )]
    pub async fn delete_group_by_name(&self, name: &str) -> Result<GroupDeletion, DomainError> {
        info!("Deleting group by name");

        if name.trim().is_empty() {
            return Err(self.failed(
                "delete_group_by_name",
                DomainError::validation("name", "group name must not be empty"),
            ));
        }

        match self.run_delete(name).await {
            Ok(deletion) => {
                let outcome = match &deletion {
                    GroupDeletion::NotFound { name } => AccountOutcome::GroupNotFound {
                        name: name.clone(),
                        at: Utc::now(),
                    },
                    GroupDeletion::Deleted(s) => AccountOutcome::GroupDeleted {
                        group_id: s.group_id,
                        name: s.group_name.clone(),
                        members_deleted: s.members_deleted,
                        dry_run: s.dry_run,
                        at: Utc::now(),
                    },
                };
                self.outcomes.record(&outcome);
                Ok(deletion)
            }
            Err(e) => Err(self.failed("delete_group_by_name", e)),
        }
    }

    // --- transaction plumbing ---

    async fn begin(&self) -> Result<Box<dyn AccountsTx>, DomainError> {
        self.store
            .begin()
            .await
            .map_err(|e| DomainError::store("begin transaction", e))
    }

    /// Commit on success (roll back in dry-run mode), roll back on error.
    async fn finish<T>(
        &self,
        tx: Box<dyn AccountsTx>,
        result: Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        match result {
            Ok(value) if self.config.dry_run => {
                tx.rollback()
                    .await
                    .map_err(|e| DomainError::store("roll back dry run", e))?;
                debug!("Dry run: transaction rolled back");
                Ok(value)
            }
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| DomainError::store("commit", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %format!("{rb:#}"), "Rollback failed");
                }
                Err(err)
            }
        }
    }

    fn failed(&self, operation: &'static str, err: DomainError) -> DomainError {
        self.outcomes.record(&AccountOutcome::OperationFailed {
            operation,
            message: err.to_string(),
            at: Utc::now(),
        });
        err
    }

    // --- provisioning ---

    async fn run_reconcile(&self) -> Result<ProvisionReport, DomainError> {
        let tx = self.begin().await?;
        let result = self.provision_missing(tx.as_ref()).await;
        self.finish(tx, result).await
    }

    async fn provision_missing(&self, tx: &dyn AccountsTx) -> Result<ProvisionReport, DomainError> {
        let pending = tx
            .users_without_profile()
            .await
            .map_err(|e| DomainError::store("find users without profile", e))?;
        debug!(count = pending.len(), "Found users without profile");

        let now = Utc::now();
        let mut report = ProvisionReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        for user_id in pending {
            let profile = NewProfile::with_defaults(user_id, &self.config.profile_defaults, now);
            let inserted = tx.insert_profile(profile).await.map_err(|e| {
                DomainError::store(format!("insert profile for user {user_id}"), e)
            })?;
            match inserted {
                InsertOutcome::Inserted => report.provisioned.push(user_id),
                InsertOutcome::AlreadyExists => {
                    warn!(user_id, "Profile already exists; skipping");
                    report.already_existed.push(user_id);
                }
            }
        }

        report.provisioned.sort_unstable();
        report.already_existed.sort_unstable();
        Ok(report)
    }

    // --- eradication ---

    async fn run_delete(&self, name: &str) -> Result<GroupDeletion, DomainError> {
        let tx = self.begin().await?;
        let result = match self.eradicate(tx.as_ref(), name).await {
            Ok(deletion @ GroupDeletion::NotFound { .. }) => {
                tx.rollback()
                    .await
                    .map_err(|e| DomainError::store("roll back", e))?;
                return Ok(deletion);
            }
            other => other,
        };
        self.finish(tx, result).await
    }

    async fn eradicate(&self, tx: &dyn AccountsTx, name: &str) -> Result<GroupDeletion, DomainError> {
        let not_found = || GroupDeletion::NotFound {
            name: name.to_string(),
        };

        let Some(group) = tx
            .find_group_by_name(name)
            .await
            .map_err(|e| DomainError::store(format!("find group '{name}'"), e))?
        else {
            info!("Group not found; nothing to delete");
            return Ok(not_found());
        };

        let members = tx
            .list_group_members(group.id)
            .await
            .map_err(|e| DomainError::store(format!("list members of group {}", group.id), e))?;
        debug!(group_id = group.id, count = members.len(), "Deleting memberships");

        // Memberships go first; the group row is referenced without cascade.
        let mut members_deleted = 0u64;
        for member in &members {
            let deleted = tx.delete_group_member(member.id).await.map_err(|e| {
                DomainError::store(format!("delete membership {}", member.id), e)
            })?;
            if deleted {
                members_deleted += 1;
            }
        }

        let deleted = tx
            .delete_group(group.id)
            .await
            .map_err(|e| DomainError::store(format!("delete group {}", group.id), e))?;
        if !deleted {
            warn!(group_id = group.id, "Group vanished before it could be deleted");
            return Ok(not_found());
        }

        info!(
            group_id = group.id,
            members_deleted, "Group and memberships deleted"
        );
        Ok(GroupDeletion::Deleted(GroupDeletionSummary {
            group_id: group.id,
            group_name: group.name,
            members_deleted,
            dry_run: self.config.dry_run,
        }))
    }
}
