//! Generic CRUD handlers, parameterised over a [`Record`] and its
//! [`Resource`] payloads.

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use service_core::error::{AppError, FORBIDDEN_MESSAGE, NOT_FOUND_MESSAGE};

use crate::dtos::pagination::{ListQuery, PageResponse, Pagination};
use crate::middleware::{guarded, RequestContext, RouteGuard};
use crate::models::{Organization, User};
use crate::store::{naming, record, Filter, JoinTable, Record, StoreError, Transaction};
use crate::utils::{ValidatedJson, ValidatedQuery};
use crate::AppState;

/// Associations created together with a new record.
pub struct InitialLinks {
    pub join: &'static JoinTable,
    /// Audit snapshot field listing the linked ids.
    pub field: &'static str,
    pub children: Vec<Uuid>,
}

/// An entity that can be created and updated over HTTP.
#[async_trait]
pub trait Resource: Record {
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;

    /// Links to add once the record is inserted. Children are checked by
    /// `create`.
    fn initial_links(_payload: &Self::Create) -> Vec<InitialLinks> {
        Vec::new()
    }

    /// Builds the record to insert. May read through `tx`, never writes.
    async fn create(
        payload: Self::Create,
        ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<Self, AppError>;

    /// Merges `payload` into the current record.
    async fn apply(
        &mut self,
        payload: Self::Update,
        ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<(), AppError>;

    fn check_delete(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Rejects permission strings missing from the catalogue.
pub fn validate_permissions(permissions: &[String]) -> Result<(), AppError> {
    let unknown = crate::services::catalogue::unknown(permissions);
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Unknown permissions: {}",
            unknown.join(", ")
        )))
    }
}

async fn exists<R: Record>(tx: &mut dyn Transaction, id: Uuid) -> Result<bool, StoreError> {
    Ok(tx.find_row(R::TABLE, &Filter::id(id)).await?.is_some())
}

/// Rejects a payload whose `field` names no existing `R`.
pub async fn ensure_exists<R: Record>(
    tx: &mut dyn Transaction,
    id: Uuid,
    field: &str,
) -> Result<(), AppError> {
    if exists::<R>(tx, id).await? {
        Ok(())
    } else {
        Err(AppError::bad_request(format!("{field} does not match an existing record")))
    }
}

/// Sellers and buyers are users or organizations.
pub async fn ensure_party(
    tx: &mut dyn Transaction,
    id: Uuid,
    field: &str,
) -> Result<(), AppError> {
    if exists::<User>(tx, id).await? || exists::<Organization>(tx, id).await? {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "{field} must be an existing user or organization"
        )))
    }
}

/// Search predicate from `searchTerm`/`searchColumn`. Without a column the
/// term is matched against every searchable column.
pub fn search_filter<R: Record>(query: &ListQuery) -> Result<Filter, AppError> {
    let searchable = R::TABLE.searchable;

    let column = match query.search_column.as_deref().filter(|c| !c.is_empty()) {
        Some(requested) => {
            let column = naming::to_snake_case(requested);
            if !searchable.contains(&column.as_str()) {
                return Err(AppError::bad_request(format!(
                    "searchColumn must be one of: {}",
                    searchable
                        .iter()
                        .map(|c| naming::to_camel_case(c))
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            Some(column)
        }
        None => None,
    };

    let term = match query.search_term.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => term,
        _ => return Ok(Filter::True),
    };

    Ok(match column {
        Some(column) => Filter::Like(column, term.to_string()),
        None if searchable.is_empty() => Filter::True,
        None => Filter::Or(
            searchable
                .iter()
                .map(|c| Filter::Like(c.to_string(), term.to_string()))
                .collect(),
        ),
    })
}

fn not_found() -> AppError {
    AppError::not_found(NOT_FOUND_MESSAGE)
}

fn public_list<R: Record>(records: &[R]) -> Result<Vec<Value>, AppError> {
    Ok(records
        .iter()
        .map(Record::public_json)
        .collect::<Result<Vec<_>, _>>()?)
}

pub async fn list<R: Record>(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Json<PageResponse<Value>>, AppError> {
    let filter = Filter::and([ctx.policies.clone(), search_filter::<R>(&query)?]);

    let mut tx = ctx.begin(state.store.as_ref()).await?;
    let (records, total) = record::list::<R>(tx.as_mut(), &filter, query.page_request()).await?;
    tx.rollback().await?;

    Ok(Json(PageResponse {
        items: public_list(&records)?,
        pagination: Pagination::new(total, query.page(), query.page_size()),
    }))
}

pub async fn get_one<R: Record>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;
    let found = record::find::<R>(tx.as_mut(), id, &ctx.policies).await?;
    tx.rollback().await?;

    let found = found.ok_or_else(not_found)?;
    Ok(Json(found.public_json()?))
}

#[tracing::instrument(skip_all, fields(table = R::TABLE.name, user_id = %ctx.user_id()))]
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<R::Create>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;

    let links = R::initial_links(&payload);
    let new_record = R::create(payload, &ctx, tx.as_mut()).await?;
    let stored = record::insert(tx.as_mut(), new_record).await?;
    for link in links {
        for child in link.children {
            record::link(tx.as_mut(), link.join, link.field, &stored, child).await?;
        }
    }

    // A caller may not create rows they would be unable to see.
    if record::find::<R>(tx.as_mut(), stored.id(), &ctx.policies)
        .await?
        .is_none()
    {
        tx.rollback().await?;
        return Err(AppError::forbidden(FORBIDDEN_MESSAGE));
    }

    tx.commit().await?;
    tracing::info!(id = %stored.id(), "Record created");

    Ok((StatusCode::CREATED, Json(stored.public_json()?)))
}

#[tracing::instrument(skip_all, fields(table = R::TABLE.name, user_id = %ctx.user_id(), %id))]
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<R::Update>,
) -> Result<Json<Value>, AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;

    let mut current: R = record::find(tx.as_mut(), id, &ctx.policies)
        .await?
        .ok_or_else(not_found)?;
    current.apply(payload, &ctx, tx.as_mut()).await?;
    let stored = record::update(tx.as_mut(), current).await?;

    if record::find::<R>(tx.as_mut(), id, &ctx.policies)
        .await?
        .is_none()
    {
        tx.rollback().await?;
        return Err(AppError::forbidden(FORBIDDEN_MESSAGE));
    }

    tx.commit().await?;
    tracing::info!("Record updated");

    Ok(Json(stored.public_json()?))
}

#[tracing::instrument(skip_all, fields(table = R::TABLE.name, user_id = %ctx.user_id(), %id))]
pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let mut tx = ctx.begin(state.store.as_ref()).await?;

    let current: R = record::find(tx.as_mut(), id, &ctx.policies)
        .await?
        .ok_or_else(not_found)?;
    current.check_delete()?;
    record::delete(tx.as_mut(), &current).await?;

    tx.commit().await?;
    tracing::info!("Record deleted");

    Ok(Json(current.public_json()?))
}

fn guard_for<R: Record>(action: &str) -> RouteGuard {
    RouteGuard::new([format!("{}.{}", R::TABLE.permission_domain, action)])
        .with_policies(R::TABLE.policies)
}

/// `GET path` and `GET path/:id`.
pub fn read_routes<R: Record>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, guarded(get(list::<R>), guard_for::<R>("view")))
        .route(
            &format!("{path}/:id"),
            guarded(get(get_one::<R>), guard_for::<R>("view")),
        )
}

/// Full CRUD under `path`, guarded by `<domain>.view|create|update|delete`.
pub fn crud_routes<R: Resource>(path: &str) -> Router<AppState> {
    let item = format!("{path}/:id");
    read_routes::<R>(path)
        .route(path, guarded(post(create::<R>), guard_for::<R>("create")))
        .route(&item, guarded(put(update::<R>), guard_for::<R>("update")))
        .route(&item, guarded(delete(remove::<R>), guard_for::<R>("delete")))
}
