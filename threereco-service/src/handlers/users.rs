use async_trait::async_trait;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::assignment::{association_routes, Association};
use super::resource::{crud_routes, ensure_exists, validate_permissions, InitialLinks, Resource};
use crate::middleware::RequestContext;
use crate::models::{Address, Organization, Role, User, UserType, USERS_ROLES};
use crate::store::{JoinTable, Transaction};
use crate::utils::password;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// When absent a random password is set and `passwordReset` raised.
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub job_title: Option<String>,
    #[serde(rename = "type")]
    pub user_type: UserType,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[validate(nested)]
    pub address: Option<Address>,
    #[validate(length(min = 1, max = 64))]
    pub id_number: Option<String>,
    pub primary_organization_id: Option<Uuid>,
    /// Role ids granted at creation.
    #[serde(default)]
    pub roles: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub job_title: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<UserType>,
    pub permissions: Option<Vec<String>>,
    #[validate(nested)]
    pub address: Option<Address>,
    #[validate(length(min = 1, max = 64))]
    pub id_number: Option<String>,
    pub primary_organization_id: Option<Uuid>,
}

#[async_trait]
impl Resource for User {
    type Create = CreateUserRequest;
    type Update = UpdateUserRequest;

    fn initial_links(payload: &CreateUserRequest) -> Vec<InitialLinks> {
        vec![InitialLinks {
            join: &USERS_ROLES,
            field: UserRoles::FIELD,
            children: payload.roles.clone(),
        }]
    }

    async fn create(
        payload: CreateUserRequest,
        _ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<Self, AppError> {
        validate_permissions(&payload.permissions)?;
        if let Some(org_id) = payload.primary_organization_id {
            ensure_exists::<Organization>(tx, org_id, "primaryOrganizationId").await?;
        }
        for role_id in &payload.roles {
            ensure_exists::<Role>(tx, *role_id, "roles").await?;
        }

        let (password, generated) = match payload.password {
            Some(password) => (password, false),
            None => (password::generate(), true),
        };
        let hash = password::hash_blocking(password).await?;

        let mut user = User::new(
            payload.email.trim().to_lowercase(),
            hash,
            payload.name,
            payload.user_type,
        );
        user.password_reset = generated;
        user.phone = payload.phone;
        user.image = payload.image;
        user.job_title = payload.job_title;
        user.permissions = payload.permissions;
        user.address = payload.address;
        user.id_number = payload.id_number;
        user.primary_organization_id = payload.primary_organization_id;
        Ok(user)
    }

    async fn apply(
        &mut self,
        payload: UpdateUserRequest,
        _ctx: &RequestContext,
        tx: &mut dyn Transaction,
    ) -> Result<(), AppError> {
        if let Some(permissions) = payload.permissions {
            validate_permissions(&permissions)?;
            self.permissions = permissions;
        }
        if let Some(org_id) = payload.primary_organization_id {
            ensure_exists::<Organization>(tx, org_id, "primaryOrganizationId").await?;
            self.primary_organization_id = Some(org_id);
        }
        if let Some(password) = payload.password {
            self.password_hash = password::hash_blocking(password).await?;
            self.password_reset = false;
        }
        if let Some(email) = payload.email {
            self.email = email.trim().to_lowercase();
        }
        if payload.name.is_some() {
            self.name = payload.name;
        }
        if payload.phone.is_some() {
            self.phone = payload.phone;
        }
        if payload.image.is_some() {
            self.image = payload.image;
        }
        if payload.job_title.is_some() {
            self.job_title = payload.job_title;
        }
        if payload.address.is_some() {
            self.address = payload.address;
        }
        if payload.id_number.is_some() {
            self.id_number = payload.id_number;
        }
        if let Some(user_type) = payload.user_type {
            self.user_type = user_type;
        }
        Ok(())
    }
}

pub struct UserRoles;

impl Association for UserRoles {
    type Parent = User;
    type Child = Role;
    const JOIN: &'static JoinTable = &USERS_ROLES;
    const FIELD: &'static str = "roles";
}

pub fn routes() -> Router<AppState> {
    crud_routes::<User>("/users").merge(association_routes::<UserRoles>("/users"))
}
