use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::TableDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub gw_code: String,
    pub carbon_factor: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl Material {
    pub fn new(name: String, gw_code: String, carbon_factor: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            gw_code,
            carbon_factor,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    Material,
    TableDescriptor {
        name: "materials",
        audited: true,
        unique: &["name", "gw_code"],
        searchable: &["name", "gw_code"],
        policies: &[],
        permission_domain: "materials",
        references: &[],
    }
);
