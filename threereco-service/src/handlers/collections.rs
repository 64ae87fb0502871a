use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::assignment::{association_routes, Association};
use super::resource::{crud_routes, ensure_party, Resource};
use crate::middleware::RequestContext;
use crate::models::{Collection, Material, COLLECTIONS_MATERIALS};
use crate::store::{JoinTable, Transaction};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    /// Defaults to the caller.
    pub seller_id: Option<Uuid>,
    pub buyer_id: Uuid,
    #[validate(range(min = 0.0))]
    pub weight: f64,
    #[validate(range(min = 0.0))]
    pub value: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionRequest {
    pub buyer_id: Option<Uuid>,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    #[validate(range(min = 0.0))]
    pub value: Option<f64>,
}

#[async_trait]
impl Resource for Collection {
    type Create = CreateCollectionRequest;
    type Update = UpdateCollectionRequest;

    async fn create(
        payload: CreateCollectionRequest,
        ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        let seller_id = payload.seller_id.unwrap_or_else(|| ctx.user_id());
        ensure_party(tx, seller_id, "sellerId").await?;
        ensure_party(tx, payload.buyer_id, "buyerId").await?;

        Ok(Collection::new(
            seller_id,
            payload.buyer_id,
            payload.weight,
            payload.value,
        ))
    }

    async fn apply(
        &mut self,
        payload: UpdateCollectionRequest,
        _ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(buyer_id) = payload.buyer_id {
            ensure_party(tx, buyer_id, "buyerId").await?;
            self.buyer_id = buyer_id;
        }
        if let Some(weight) = payload.weight {
            self.weight = weight;
        }
        if let Some(value) = payload.value {
            self.value = value;
        }
        Ok(())
    }
}

pub struct CollectionMaterials;

impl Association for CollectionMaterials {
    type Parent = Collection;
    type Child = Material;
    const JOIN: &'static JoinTable = &COLLECTIONS_MATERIALS;
    const FIELD: &'static str = "materials";
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Collection>("/collections")
        .merge(association_routes::<CollectionMaterials>("/collections"))
}
