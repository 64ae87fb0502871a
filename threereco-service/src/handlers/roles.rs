use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use validator::Validate;

use service_core::error::AppError;

use super::resource::{crud_routes, validate_permissions, Resource};
use crate::middleware::RequestContext;
use crate::models::Role;
use crate::store::Transaction;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[async_trait]
impl Resource for Role {
    type Create = CreateRoleRequest;
    type Update = UpdateRoleRequest;

    async fn create(
        payload: CreateRoleRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        validate_permissions(&payload.permissions)?;
        Ok(Role::new(payload.name, payload.description, payload.permissions))
    }

    async fn apply(
        &mut self,
        payload: UpdateRoleRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(permissions) = payload.permissions {
            validate_permissions(&permissions)?;
            self.permissions = permissions;
        }
        if let Some(name) = payload.name {
            self.name = name;
        }
        if payload.description.is_some() {
            self.description = payload.description;
        }
        Ok(())
    }

    fn check_delete(&self) -> Result<(), AppError> {
        if self.is_default {
            return Err(AppError::forbidden("Default roles cannot be deleted"));
        }
        Ok(())
    }
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Role>("/roles")
}
