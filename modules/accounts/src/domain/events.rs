use chrono::{DateTime, Utc};

/// Transport-agnostic outcome of one account operation, reported to the outcome sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    ProfilesReconciled {
        provisioned: usize,
        skipped: usize,
        dry_run: bool,
        at: DateTime<Utc>,
    },
    GroupDeleted {
        group_id: i64,
        name: String,
        members_deleted: u64,
        dry_run: bool,
        at: DateTime<Utc>,
    },
    GroupNotFound {
        name: String,
        at: DateTime<Utc>,
    },
    OperationFailed {
        operation: &'static str,
        message: String,
        at: DateTime<Utc>,
    },
}

impl AccountOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::OperationFailed { .. })
    }
}
