pub mod address;
pub mod audit_log;
pub mod bank_details;
pub mod collection;
pub mod material;
pub mod notification;
pub mod organization;
pub mod product;
pub mod role;
pub mod transaction;
pub mod user;

pub use address::Address;
pub use audit_log::AuditLog;
pub use bank_details::BankDetails;
pub use collection::{Collection, COLLECTIONS_MATERIALS};
pub use material::Material;
pub use notification::Notification;
pub use organization::{Organization, ORGANIZATIONS_ROLES, ORGANIZATIONS_USERS};
pub use product::{Product, PRODUCTS_MATERIALS};
pub use role::Role;
pub use transaction::{Transaction, TransactionType, TRANSACTIONS_PRODUCTS};
pub use user::{User, UserType, USERS_ROLES};

/// Implements [`crate::store::Record`] for entities with the standard
/// `id` / `updated_at` / `modified_by_id` bookkeeping fields.
macro_rules! record {
    ($ty:ty, $table:expr) => {
        impl crate::store::Record for $ty {
            const TABLE: &'static crate::store::TableDescriptor = &$table;

            fn id(&self) -> uuid::Uuid {
                self.id
            }

            fn touch(&mut self, modified_by: Option<uuid::Uuid>, at: chrono::DateTime<chrono::Utc>) {
                self.updated_at = at;
                self.modified_by_id = modified_by;
            }
        }
    };
}

pub(crate) use record;
