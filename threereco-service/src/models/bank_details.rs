use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{ForeignKey, OnDelete, TableDescriptor};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_holder: String,
    pub account_number: String,
    pub bank_name: String,
    pub branch_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl BankDetails {
    pub fn new(
        user_id: Uuid,
        account_holder: String,
        account_number: String,
        bank_name: String,
        branch_code: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            account_holder,
            account_number,
            bank_name,
            branch_code,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    BankDetails,
    TableDescriptor {
        name: "bank_details",
        audited: true,
        unique: &[],
        searchable: &["account_holder", "bank_name"],
        policies: &[],
        permission_domain: "bank_details",
        references: &[ForeignKey {
            column: "user_id",
            table: "users",
            on_delete: OnDelete::Restrict,
        }],
    }
);
