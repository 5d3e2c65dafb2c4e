use crate::contract::model::{Group, GroupMember};
use crate::infra::storage::entity::{group, group_member};

impl From<group::Model> for Group {
    fn from(m: group::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

impl From<group_member::Model> for GroupMember {
    fn from(m: group_member::Model) -> Self {
        Self {
            id: m.id,
            group_id: m.group_id,
            user_id: m.user_id,
            role: m.role,
            joined_at: m.joined_at,
        }
    }
}
