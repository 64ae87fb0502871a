use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::assignment::{association_routes, Association};
use super::resource::{crud_routes, ensure_party, Resource};
use crate::middleware::RequestContext;
use crate::models::{Product, Transaction, TransactionType, TRANSACTIONS_PRODUCTS};
use crate::store::{self, JoinTable};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    #[validate(range(min = 0.0))]
    pub weight: f64,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    pub seller_type: Option<String>,
    pub buyer_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    #[validate(range(min = 0.0))]
    pub amount: Option<f64>,
    pub seller_accepted: Option<bool>,
    pub seller_declined: Option<bool>,
}

#[async_trait]
impl Resource for Transaction {
    type Create = CreateTransactionRequest;
    type Update = UpdateTransactionRequest;

    async fn create(
        payload: CreateTransactionRequest,
        _ctx: &RequestContext,
        tx: &mut dyn store::Transaction,
    ) -> Result<Self, AppError> {
        if payload.seller_id == payload.buyer_id {
            return Err(AppError::bad_request("Seller and buyer must differ"));
        }
        ensure_party(tx, payload.seller_id, "sellerId").await?;
        ensure_party(tx, payload.buyer_id, "buyerId").await?;

        let mut transaction = Transaction::new(
            payload.kind,
            payload.seller_id,
            payload.buyer_id,
            payload.weight,
            payload.amount,
        );
        transaction.seller_type = payload.seller_type;
        transaction.buyer_type = payload.buyer_type;
        Ok(transaction)
    }

    async fn apply(
        &mut self,
        payload: UpdateTransactionRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn store::Transaction,
    ) -> Result<(), AppError> {
        if let Some(weight) = payload.weight {
            self.weight = weight;
        }
        if let Some(amount) = payload.amount {
            self.amount = amount;
        }
        if let Some(accepted) = payload.seller_accepted {
            self.seller_accepted = accepted;
        }
        if let Some(declined) = payload.seller_declined {
            self.seller_declined = declined;
        }
        if self.seller_accepted && self.seller_declined {
            return Err(AppError::bad_request(
                "A transaction cannot be both accepted and declined",
            ));
        }
        Ok(())
    }
}

pub struct TransactionProducts;

impl Association for TransactionProducts {
    type Parent = Transaction;
    type Child = Product;
    const JOIN: &'static JoinTable = &TRANSACTIONS_PRODUCTS;
    const FIELD: &'static str = "products";
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Transaction>("/transactions")
        .merge(association_routes::<TransactionProducts>("/transactions"))
}
