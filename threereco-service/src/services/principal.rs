//! Principal store: a user hydrated with its roles and organizations.

use std::collections::BTreeSet;

use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use service_core::error::{AppError, UNAUTHORIZED_MESSAGE};

use super::PermissionSet;
use crate::models::{Organization, Role, User, ORGANIZATIONS_USERS, USERS_ROLES};
use crate::store::{record, AuditScope, Filter, Record, Store, StoreError};

#[derive(Debug, Error)]
pub enum PrincipalError {
    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PrincipalError> for AppError {
    fn from(err: PrincipalError) -> Self {
        match err {
            PrincipalError::NotFound(id) => {
                tracing::debug!(user_id = %id, "Session bound to missing user");
                AppError::unauthorized(UNAUTHORIZED_MESSAGE)
            }
            PrincipalError::Store(e) => e.into(),
        }
    }
}

/// The authenticated subject of a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub roles: Vec<Role>,
    pub organizations: Vec<Organization>,
    permissions: PermissionSet,
}

impl Principal {
    pub fn new(user: User, roles: Vec<Role>, organizations: Vec<Organization>) -> Self {
        let permissions = PermissionSet::new(
            user.permissions
                .iter()
                .chain(roles.iter().flat_map(|role| role.permissions.iter())),
        );
        Self {
            user,
            roles,
            organizations,
            permissions,
        }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    /// Direct permissions plus those of every held role.
    pub fn effective_permissions(&self) -> BTreeSet<String> {
        self.user
            .permissions
            .iter()
            .chain(self.roles.iter().flat_map(|role| role.permissions.iter()))
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Any-of check over `required`; empty means any authenticated principal.
    pub fn is_allowed<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.permissions.allows_any(required)
    }

    /// Response body for the session check endpoint.
    pub fn to_json(&self) -> Result<Value, StoreError> {
        let mut body = self.user.public_json()?;
        if let Value::Object(map) = &mut body {
            map.insert(
                "roles".into(),
                Value::Array(
                    self.roles
                        .iter()
                        .map(Record::public_json)
                        .collect::<Result<_, _>>()?,
                ),
            );
            map.insert(
                "organizations".into(),
                Value::Array(
                    self.organizations
                        .iter()
                        .map(Record::public_json)
                        .collect::<Result<_, _>>()?,
                ),
            );
            map.insert("effectivePermissions".into(), json!(self.effective_permissions()));
        }
        Ok(body)
    }
}

/// Loads the user with all role and organization memberships in one
/// read-only transaction.
pub async fn load(store: &dyn Store, user_id: Uuid) -> Result<Principal, PrincipalError> {
    let mut tx = store.begin(AuditScope::anonymous()).await?;

    let user: User = record::find_by(tx.as_mut(), &Filter::id(user_id))
        .await?
        .ok_or(PrincipalError::NotFound(user_id))?;

    let role_ids = tx.linked(&USERS_ROLES, user_id).await?;
    let roles = record::find_many::<Role>(tx.as_mut(), &role_ids).await?;

    let organization_ids = tx.linked_reverse(&ORGANIZATIONS_USERS, user_id).await?;
    let organizations = record::find_many::<Organization>(tx.as_mut(), &organization_ids).await?;

    tx.rollback().await?;

    Ok(Principal::new(user, roles, organizations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_load_hydrates_memberships() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();

        let user = record::insert(
            tx.as_mut(),
            User::new("alice@example.com".into(), "hash".into(), None, UserType::Business),
        )
        .await
        .unwrap();
        let role = record::insert(
            tx.as_mut(),
            Role::new("Viewer".into(), None, vec!["materials.view".into()]),
        )
        .await
        .unwrap();
        let org = record::insert(
            tx.as_mut(),
            Organization::new("Acme".into(), "acme.test".into(), Some(user.id)),
        )
        .await
        .unwrap();
        record::link(tx.as_mut(), &USERS_ROLES, "roles", &user, role.id).await.unwrap();
        record::link(tx.as_mut(), &ORGANIZATIONS_USERS, "users", &org, user.id).await.unwrap();
        tx.commit().await.unwrap();

        let principal = load(&store, user.id).await.unwrap();

        assert_eq!(principal.roles.len(), 1);
        assert_eq!(principal.organizations.len(), 1);
        assert!(principal.is_allowed(&["materials.view"]));
        assert!(!principal.is_allowed(&["materials.create"]));
    }

    #[tokio::test]
    async fn test_load_missing_user() {
        let store = MemoryStore::new();
        let err = load(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PrincipalError::NotFound(_)));
    }

    #[test]
    fn test_effective_permissions_union() {
        let mut user = User::new("a@b.co".into(), "hash".into(), None, UserType::Collector);
        user.permissions = vec!["collections.view".into()];
        let role = Role::new("R".into(), None, vec!["materials.view".into(), " collections.view ".into()]);

        let principal = Principal::new(user, vec![role], Vec::new());

        let effective: Vec<_> = principal.effective_permissions().into_iter().collect();
        assert_eq!(effective, vec!["collections.view", "materials.view"]);
    }

    #[test]
    fn test_to_json_omits_secrets() {
        let user = User::new("a@b.co".into(), "hash".into(), None, UserType::Collector);
        let json = Principal::new(user, Vec::new(), Vec::new()).to_json().unwrap();
        assert_eq!(json["email"], "a@b.co");
        assert!(json.get("passwordHash").is_none());
        assert!(json["roles"].is_array());
    }
}
