use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::resource::{crud_routes, ensure_exists, Resource};
use crate::middleware::RequestContext;
use crate::models::{BankDetails, User};
use crate::store::Transaction;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankDetailsRequest {
    /// Defaults to the caller.
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub account_holder: String,
    #[validate(length(min = 4, max = 34))]
    pub account_number: String,
    #[validate(length(min = 1, max = 255))]
    pub bank_name: String,
    #[validate(length(min = 1, max = 32))]
    pub branch_code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankDetailsRequest {
    #[validate(length(min = 1, max = 255))]
    pub account_holder: Option<String>,
    #[validate(length(min = 4, max = 34))]
    pub account_number: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub bank_name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub branch_code: Option<String>,
}

#[async_trait]
impl Resource for BankDetails {
    type Create = CreateBankDetailsRequest;
    type Update = UpdateBankDetailsRequest;

    async fn create(
        payload: CreateBankDetailsRequest,
        ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        let user_id = payload.user_id.unwrap_or_else(|| ctx.user_id());
        ensure_exists::<User>(tx, user_id, "userId").await?;

        Ok(BankDetails::new(
            user_id,
            payload.account_holder,
            payload.account_number,
            payload.bank_name,
            payload.branch_code,
        ))
    }

    async fn apply(
        &mut self,
        payload: UpdateBankDetailsRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(holder) = payload.account_holder {
            self.account_holder = holder;
        }
        if let Some(number) = payload.account_number {
            self.account_number = number;
        }
        if let Some(bank) = payload.bank_name {
            self.bank_name = bank;
        }
        if let Some(branch) = payload.branch_code {
            self.branch_code = branch;
        }
        Ok(())
    }
}

pub fn routes() -> Router<AppState> {
    crud_routes::<BankDetails>("/bank-details")
}
