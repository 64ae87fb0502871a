use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::policy::PolicyKind;
use crate::store::{JoinTable, TableDescriptor};

pub const COLLECTIONS_MATERIALS: JoinTable = JoinTable {
    name: "collections_materials",
    left_table: "collections",
    left: "collection_id",
    right_table: "materials",
    right: "material_id",
};

/// Material handed over by a collector (`seller_id`, a user) to a
/// buying organization (`buyer_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub weight: f64,
    pub value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl Collection {
    pub fn new(seller_id: Uuid, buyer_id: Uuid, weight: f64, value: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            seller_id,
            buyer_id,
            weight,
            value,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    Collection,
    TableDescriptor {
        name: "collections",
        audited: true,
        unique: &[],
        searchable: &["seller_id", "buyer_id"],
        policies: &[PolicyKind::Collections],
        permission_domain: "collections",
        references: &[],
    }
);
