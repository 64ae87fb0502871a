use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{JoinTable, TableDescriptor};

pub const PRODUCTS_MATERIALS: JoinTable = JoinTable {
    name: "products_materials",
    left_table: "products",
    left: "product_id",
    right_table: "materials",
    right: "material_id",
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl Product {
    pub fn new(name: String, value: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            value,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    Product,
    TableDescriptor {
        name: "products",
        audited: true,
        unique: &[],
        searchable: &["name"],
        policies: &[],
        permission_domain: "products",
        references: &[],
    }
);
