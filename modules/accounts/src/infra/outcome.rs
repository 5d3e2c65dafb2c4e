use tracing::{error, info};

use crate::domain::events::AccountOutcome;
use crate::domain::ports::OutcomeSink;

/// Reports outcomes as structured tracing events under `accounts::outcome`,
/// where a log shipper can pick them up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutcomeSink;

impl OutcomeSink for TracingOutcomeSink {
    fn record(&self, outcome: &AccountOutcome) {
        match outcome {
            AccountOutcome::ProfilesReconciled {
                provisioned,
                skipped,
                dry_run,
                at,
            } => info!(
                target: "accounts::outcome",
                outcome = "profiles_reconciled",
                provisioned,
                skipped,
                dry_run,
                at = %at.to_rfc3339(),
            ),
            AccountOutcome::GroupDeleted {
                group_id,
                name,
                members_deleted,
                dry_run,
                at,
            } => info!(
                target: "accounts::outcome",
                outcome = "group_deleted",
                group_id,
                group_name = %name,
                members_deleted,
                dry_run,
                at = %at.to_rfc3339(),
            ),
            AccountOutcome::GroupNotFound { name, at } => info!(
                target: "accounts::outcome",
                outcome = "group_not_found",
                group_name = %name,
                at = %at.to_rfc3339(),
            ),
            AccountOutcome::OperationFailed {
                operation,
                message,
                at,
            } => error!(
                target: "accounts::outcome",
                outcome = "operation_failed",
                operation,
                error = %message,
                at = %at.to_rfc3339(),
            ),
        }
    }
}
