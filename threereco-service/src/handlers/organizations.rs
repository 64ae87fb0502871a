use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::assignment::{association_routes, Association};
use super::resource::{crud_routes, ensure_exists, Resource};
use crate::middleware::RequestContext;
use crate::models::{Organization, Role, User, ORGANIZATIONS_ROLES, ORGANIZATIONS_USERS};
use crate::store::{JoinTable, Transaction};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub domain: String,
    /// Defaults to the caller.
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub domain: Option<String>,
    pub owner_id: Option<Uuid>,
}

#[async_trait]
impl Resource for Organization {
    type Create = CreateOrganizationRequest;
    type Update = UpdateOrganizationRequest;

    async fn create(
        payload: CreateOrganizationRequest,
        ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        let owner_id = payload.owner_id.unwrap_or_else(|| ctx.user_id());
        ensure_exists::<User>(tx, owner_id, "ownerId").await?;

        Ok(Organization::new(
            payload.name,
            payload.domain.trim().to_lowercase(),
            Some(owner_id),
        ))
    }

    async fn apply(
        &mut self,
        payload: UpdateOrganizationRequest,
        _ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(owner_id) = payload.owner_id {
            ensure_exists::<User>(tx, owner_id, "ownerId").await?;
            self.owner_id = Some(owner_id);
        }
        if let Some(name) = payload.name {
            self.name = name;
        }
        if let Some(domain) = payload.domain {
            self.domain = domain.trim().to_lowercase();
        }
        Ok(())
    }
}

pub struct OrganizationUsers;

impl Association for OrganizationUsers {
    type Parent = Organization;
    type Child = User;
    const JOIN: &'static JoinTable = &ORGANIZATIONS_USERS;
    const FIELD: &'static str = "users";
}

pub struct OrganizationRoles;

impl Association for OrganizationRoles {
    type Parent = Organization;
    type Child = Role;
    const JOIN: &'static JoinTable = &ORGANIZATIONS_ROLES;
    const FIELD: &'static str = "roles";
}

pub fn routes() -> Router<AppState> {
    crud_routes::<Organization>("/organizations")
        .merge(association_routes::<OrganizationUsers>("/organizations"))
        .merge(association_routes::<OrganizationRoles>("/organizations"))
}
