use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{ForeignKey, OnDelete, TableDescriptor};

/// In-app message for a user. Not audited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl Notification {
    pub fn new(user_id: Uuid, title: String, message: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            message,
            read: false,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    Notification,
    TableDescriptor {
        name: "notifications",
        audited: false,
        unique: &[],
        searchable: &["title", "message"],
        policies: &[],
        permission_domain: "notifications",
        references: &[ForeignKey {
            column: "user_id",
            table: "users",
            on_delete: OnDelete::Cascade,
        }],
    }
);
