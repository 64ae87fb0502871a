//! Idempotent startup seeding of the default roles and admin user.

use uuid::Uuid;

use crate::config::AdminSeedConfig;
use crate::models::{Role, User, UserType, USERS_ROLES};
use crate::store::{record, AuditScope, Filter, Store};
use crate::utils::password;

pub const ADMINISTRATOR_ROLE: &str = "Administrator";
pub const BUSINESS_OWNER_ROLE: &str = "Business Owner";
pub const BUSINESS_STAFF_ROLE: &str = "Business Staff";
pub const BUSINESS_USER_ROLE: &str = "Business User";

struct DefaultRole {
    name: &'static str,
    description: &'static str,
    permissions: &'static [&'static str],
}

const DEFAULT_ROLES: &[DefaultRole] = &[
    DefaultRole {
        name: ADMINISTRATOR_ROLE,
        description: "Full access to every resource",
        permissions: &["*"],
    },
    DefaultRole {
        name: BUSINESS_OWNER_ROLE,
        description: "Manages an organization, its members and its trades",
        permissions: &[
            "organizations.view",
            "organizations.update",
            "organizations.users.*",
            "organizations.roles.*",
            "users.view",
            "materials.view",
            "products.*",
            "collections.*",
            "transactions.*",
            "bank_details.*",
            "notifications.*",
        ],
    },
    DefaultRole {
        name: BUSINESS_STAFF_ROLE,
        description: "Records collections and transactions for an organization",
        permissions: &[
            "organizations.view",
            "materials.view",
            "products.view",
            "collections.view",
            "collections.create",
            "collections.update",
            "collections.materials.*",
            "transactions.view",
            "transactions.create",
            "transactions.products.*",
            "notifications.view",
        ],
    },
    DefaultRole {
        name: BUSINESS_USER_ROLE,
        description: "Read-only member of an organization",
        permissions: &[
            "organizations.view",
            "materials.view",
            "products.view",
            "collections.view",
            "transactions.view",
            "notifications.view",
        ],
    },
];

/// Creates whatever is missing and returns the admin user's id.
///
/// Every write is attributed to the admin, including the admin's own
/// insert.
pub async fn seed_defaults(store: &dyn Store, admin: &AdminSeedConfig) -> anyhow::Result<Uuid> {
    let mut lookup = store.begin(AuditScope::anonymous()).await?;
    let existing: Option<User> =
        record::find_by(lookup.as_mut(), &Filter::eq("email", admin.email.to_lowercase())).await?;
    lookup.rollback().await?;

    let admin_id = existing.as_ref().map(|u| u.id).unwrap_or_else(Uuid::new_v4);
    let mut tx = store.begin(AuditScope::acting(admin_id)).await?;

    let admin_user = match existing {
        Some(user) => user,
        None => {
            let hash = password::hash_blocking(admin.password.clone()).await?;
            let mut user = User::new(
                admin.email.to_lowercase(),
                hash,
                Some(admin.name.clone()),
                UserType::System,
            );
            user.id = admin_id;
            let user = record::insert(tx.as_mut(), user).await?;
            tracing::info!(user_id = %user.id, email = %user.email, "Seeded admin user");
            user
        }
    };

    for default in DEFAULT_ROLES {
        let found: Option<Role> =
            record::find_by(tx.as_mut(), &Filter::eq("name", default.name)).await?;
        let role = match found {
            Some(role) => role,
            None => {
                let mut role = Role::new(
                    default.name.to_string(),
                    Some(default.description.to_string()),
                    default.permissions.iter().map(|p| p.to_string()).collect(),
                );
                role.is_default = true;
                let role = record::insert(tx.as_mut(), role).await?;
                tracing::info!(role = default.name, "Seeded role");
                role
            }
        };

        if default.name == ADMINISTRATOR_ROLE {
            record::link(tx.as_mut(), &USERS_ROLES, "roles", &admin_user, role.id).await?;
        }
    }

    tx.commit().await?;
    Ok(admin_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditLog;
    use crate::store::{MemoryStore, PageRequest};

    fn admin_config() -> AdminSeedConfig {
        AdminSeedConfig {
            email: "Admin@Example.com".into(),
            password: "changeme123".into(),
            name: "Admin".into(),
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();

        let first = seed_defaults(&store, &admin_config()).await.unwrap();
        let second = seed_defaults(&store, &admin_config()).await.unwrap();
        assert_eq!(first, second);

        let mut tx = store.begin(AuditScope::anonymous()).await.unwrap();
        let (roles, total) = record::list::<Role>(tx.as_mut(), &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        assert_eq!(total, DEFAULT_ROLES.len() as u64);
        assert!(roles.iter().all(|r| r.is_default));

        let (logs, _) = record::list::<AuditLog>(tx.as_mut(), &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        assert!(logs.iter().all(|log| log.user_id == first));
        // admin + four roles + the role link, once.
        assert_eq!(logs.len(), 6);
    }

    #[tokio::test]
    async fn test_admin_holds_administrator_role() {
        let store = MemoryStore::new();
        let admin_id = seed_defaults(&store, &admin_config()).await.unwrap();

        let principal = crate::services::principal::load(&store, admin_id).await.unwrap();
        assert_eq!(principal.user.email, "admin@example.com");
        assert!(principal.is_allowed(&["anything.at.all"]));
    }
}
