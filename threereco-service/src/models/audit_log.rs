use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::services::policy::PolicyKind;
use crate::store::{Operation, Record, TableDescriptor};

/// Append-only record of one mutation of an audited table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub table_name: String,
    pub operation_type: Operation,
    pub object_id: Uuid,
    pub data: Value,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Record for AuditLog {
    const TABLE: &'static TableDescriptor = &TableDescriptor {
        name: "audit_logs",
        audited: false,
        unique: &[],
        searchable: &["table_name", "operation_type", "object_id", "user_id"],
        policies: &[PolicyKind::System],
        permission_domain: "audit_logs",
        references: &[],
    };

    fn id(&self) -> Uuid {
        self.id
    }

    // Audit rows are never rewritten.
    fn touch(&mut self, _modified_by: Option<Uuid>, _at: DateTime<Utc>) {}
}
