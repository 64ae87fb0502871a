use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{ForeignKey, JoinTable, OnDelete, TableDescriptor};

pub const ORGANIZATIONS_USERS: JoinTable = JoinTable {
    name: "organizations_users",
    left_table: "organizations",
    left: "organization_id",
    right_table: "users",
    right: "user_id",
};

pub const ORGANIZATIONS_ROLES: JoinTable = JoinTable {
    name: "organizations_roles",
    left_table: "organizations",
    left: "organization_id",
    right_table: "roles",
    right: "role_id",
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl Organization {
    pub fn new(name: String, domain: String, owner_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            domain,
            owner_id,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    Organization,
    TableDescriptor {
        name: "organizations",
        audited: true,
        unique: &["name", "domain"],
        searchable: &["name", "domain"],
        policies: &[],
        permission_domain: "organizations",
        references: &[ForeignKey {
            column: "owner_id",
            table: "users",
            on_delete: OnDelete::Restrict,
        }],
    }
);
