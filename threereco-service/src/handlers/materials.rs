use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use validator::Validate;

use service_core::error::AppError;

use super::resource::{crud_routes, Resource};
use crate::middleware::RequestContext;
use crate::models::Material;
use crate::store::Transaction;
use crate::AppState;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub gw_code: String,
    pub carbon_factor: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub gw_code: Option<String>,
    pub carbon_factor: Option<String>,
}

#[async_trait]
impl Resource for Material {
    type Create = CreateMaterialRequest;
    type Update = UpdateMaterialRequest;

    async fn create(
        payload: CreateMaterialRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        Ok(Material::new(payload.name, payload.gw_code, payload.carbon_factor))
    }

    async fn apply(
        &mut self,
        payload: UpdateMaterialRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(name) = payload.name {
            self.name = name;
        }
        if let Some(gw_code) = payload.gw_code {
            self.gw_code = gw_code;
        }
        if payload.carbon_factor.is_some() {
            self.carbon_factor = payload.carbon_factor;
        }
        Ok(())
    }
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Material>("/materials")
}
