use chrono::{DateTime, Utc};

/// Settings applied to every newly provisioned profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDefaults {
    pub timezone: String,
    pub language: String,
    pub theme: String,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            language: "en".to_string(),
            theme: "system".to_string(),
        }
    }
}

/// Profile row to be inserted for a user that has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub user_id: i64,
    pub timezone: String,
    pub language: String,
    pub theme: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewProfile {
    pub fn with_defaults(user_id: i64, defaults: &ProfileDefaults, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            timezone: defaults.timezone.clone(),
            language: defaults.language.clone(),
            theme: defaults.theme.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Result of one provisioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Users that received a profile, ascending by id.
    pub provisioned: Vec<i64>,
    /// Users skipped because another writer created their profile first.
    pub already_existed: Vec<i64>,
    pub dry_run: bool,
}

impl ProvisionReport {
    /// True when the pass had nothing to do.
    pub fn is_noop(&self) -> bool {
        self.provisioned.is_empty() && self.already_existed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDeletionSummary {
    pub group_id: i64,
    pub group_name: String,
    pub members_deleted: u64,
    pub dry_run: bool,
}

/// Outcome of deleting a group by name. A missing group is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupDeletion {
    NotFound { name: String },
    Deleted(GroupDeletionSummary),
}

impl GroupDeletion {
    pub fn summary(&self) -> Option<&GroupDeletionSummary> {
        match self {
            Self::Deleted(s) => Some(s),
            Self::NotFound { .. } => None,
        }
    }
}
