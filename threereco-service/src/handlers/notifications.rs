use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::resource::{crud_routes, ensure_exists, Resource};
use crate::middleware::RequestContext;
use crate::models::{Notification, User};
use crate::store::Transaction;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNotificationRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub message: Option<String>,
    pub read: Option<bool>,
}

#[async_trait]
impl Resource for Notification {
    type Create = CreateNotificationRequest;
    type Update = UpdateNotificationRequest;

    async fn create(
        payload: CreateNotificationRequest,
        _ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        ensure_exists::<User>(tx, payload.user_id, "userId").await?;
        Ok(Notification::new(payload.user_id, payload.title, payload.message))
    }

    async fn apply(
        &mut self,
        payload: UpdateNotificationRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(title) = payload.title {
            self.title = title;
        }
        if let Some(message) = payload.message {
            self.message = message;
        }
        if let Some(read) = payload.read {
            self.read = read;
        }
        Ok(())
    }
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Notification>("/notifications")
}
