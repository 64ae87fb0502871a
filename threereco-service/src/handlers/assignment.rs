//! Many-to-many association endpoints: `GET parent/:id/<field>`,
//! `POST|DELETE parent/:id/<field>/:child_id`.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;
use uuid::Uuid;

use service_core::error::{AppError, NOT_FOUND_MESSAGE};

use crate::dtos::MessageResponse;
use crate::middleware::{guarded, RequestContext, RouteGuard};
use crate::store::{record, Filter, JoinTable, Record};
use crate::AppState;

/// A join between a parent record and its children, exposed under the
/// parent's route.
pub trait Association: Send + Sync + 'static {
    type Parent: Record;
    type Child: Record;

    const JOIN: &'static JoinTable;

    /// Path segment, permission sub-domain and audit snapshot field.
    const FIELD: &'static str;
}

fn not_found() -> AppError {
    AppError::not_found(NOT_FOUND_MESSAGE)
}

pub async fn list_linked<A: Association>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Value>>, AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;

    let parent: A::Parent = record::find(tx.as_mut(), id, &ctx.policies)
        .await?
        .ok_or_else(not_found)?;
    let ids = tx.linked(A::JOIN, parent.id()).await?;
    let children = record::find_many::<A::Child>(tx.as_mut(), &ids).await?;
    tx.rollback().await?;

    Ok(Json(
        children
            .iter()
            .map(Record::public_json)
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

#[tracing::instrument(skip_all, fields(join = A::JOIN.name, user_id = %ctx.user_id(), %id, %child_id))]
pub async fn assign<A: Association>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, child_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;

    let parent: A::Parent = record::find(tx.as_mut(), id, &ctx.policies)
        .await?
        .ok_or_else(not_found)?;
    record::find_by::<A::Child>(tx.as_mut(), &Filter::id(child_id))
        .await?
        .ok_or_else(not_found)?;

    let added = record::link(tx.as_mut(), A::JOIN, A::FIELD, &parent, child_id).await?;
    tx.commit().await?;

    if added {
        tracing::info!("Association added");
    }
    Ok(Json(MessageResponse::new("Assigned")))
}

#[tracing::instrument(skip_all, fields(join = A::JOIN.name, user_id = %ctx.user_id(), %id, %child_id))]
pub async fn unassign<A: Association>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, child_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;

    let parent: A::Parent = record::find(tx.as_mut(), id, &ctx.policies)
        .await?
        .ok_or_else(not_found)?;

    let removed = record::unlink(tx.as_mut(), A::JOIN, A::FIELD, &parent, child_id).await?;
    tx.commit().await?;

    if removed {
        tracing::info!("Association removed");
    }
    Ok(Json(MessageResponse::new("Unassigned")))
}

/// Routes for `A` under `parent_path`, guarded by
/// `<parent domain>.<field>.view|assign|unassign` and the parent's policies.
pub fn association_routes<A: Association>(parent_path: &str) -> Router<AppState> {
    let table = <A::Parent as Record>::TABLE;
    let guard = |action: &str| {
        RouteGuard::new([format!("{}.{}.{}", table.permission_domain, A::FIELD, action)])
            .with_policies(table.policies)
    };

    let collection = format!("{parent_path}/:id/{}", A::FIELD);
    let item = format!("{collection}/:child_id");

    Router::new()
        .route(&collection, guarded(get(list_linked::<A>), guard("view")))
        .route(&item, guarded(post(assign::<A>), guard("assign")))
        .route(&item, guarded(delete(unassign::<A>), guard("unassign")))
}
