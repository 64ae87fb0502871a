use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use validator::Validate;

use service_core::error::AppError;

use super::assignment::{association_routes, Association};
use super::resource::{crud_routes, Resource};
use crate::middleware::RequestContext;
use crate::models::{Material, Product, PRODUCTS_MATERIALS};
use crate::store::{JoinTable, Transaction};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub value: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(range(min = 0.0))]
    pub value: Option<f64>,
}

#[async_trait]
impl Resource for Product {
    type Create = CreateProductRequest;
    type Update = UpdateProductRequest;

    async fn create(
        payload: CreateProductRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        Ok(Product::new(payload.name, payload.value))
    }

    async fn apply(
        &mut self,
        payload: UpdateProductRequest,
        _ctx: &RequestContext,
        _tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(name) = payload.name {
            self.name = name;
        }
        if let Some(value) = payload.value {
            self.value = value;
        }
        Ok(())
    }
}

pub struct ProductMaterials;

impl Association for ProductMaterials {
    type Parent = Product;
    type Child = Material;
    const JOIN: &'static JoinTable = &PRODUCTS_MATERIALS;
    const FIELD: &'static str = "materials";
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Product>("/products").merge(association_routes::<ProductMaterials>("/products"))
}
