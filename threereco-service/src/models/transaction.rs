use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::policy::PolicyKind;
use crate::store::{JoinTable, TableDescriptor};

pub const TRANSACTIONS_PRODUCTS: JoinTable = JoinTable {
    name: "transactions_products",
    left_table: "transactions",
    left: "transaction_id",
    right_table: "products",
    right: "product_id",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Collection,
    Transfer,
}

/// Trade between two organizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub weight: f64,
    pub amount: f64,
    pub seller_accepted: bool,
    pub seller_declined: bool,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_type: Option<String>,
    pub buyer_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modified_by_id: Option<Uuid>,
}

impl Transaction {
    pub fn new(kind: TransactionType, seller_id: Uuid, buyer_id: Uuid, weight: f64, amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            weight,
            amount,
            seller_accepted: false,
            seller_declined: false,
            seller_id,
            buyer_id,
            seller_type: None,
            buyer_type: None,
            created_at: now,
            updated_at: now,
            modified_by_id: None,
        }
    }
}

super::record!(
    Transaction,
    TableDescriptor {
        name: "transactions",
        audited: true,
        unique: &[],
        searchable: &["type", "seller_id", "buyer_id"],
        policies: &[PolicyKind::Transactions],
        permission_domain: "transactions",
        references: &[],
    }
);
