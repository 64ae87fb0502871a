//! Transactional row store.
//!
//! Handlers never talk to Postgres directly. They open a [`Transaction`]
//! carrying an [`AuditScope`], and go through the typed primitives in
//! [`record`] which perform the mutation and write the audit record in the
//! same transaction.

pub mod audit;
pub mod error;
pub mod filter;
pub mod memory;
pub mod naming;
pub mod postgres;
pub mod record;

use async_trait::async_trait;
use uuid::Uuid;

use crate::services::policy::PolicyKind;

pub use audit::{AuditScope, Operation};
pub use error::StoreError;
pub use filter::Filter;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use record::Record;

/// A stored row: column name (snake_case) to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Static description of an entity table.
#[derive(Debug)]
pub struct TableDescriptor {
    pub name: &'static str,
    /// Mutations produce audit records.
    pub audited: bool,
    /// Columns with a uniqueness constraint.
    pub unique: &'static [&'static str],
    /// Columns accepted as `searchColumn` on list endpoints.
    pub searchable: &'static [&'static str],
    /// Row policies applied to every route on this table.
    pub policies: &'static [PolicyKind],
    /// First segment of the permission strings guarding this table.
    pub permission_domain: &'static str,
    /// Columns pointing at rows of other tables.
    pub references: &'static [ForeignKey],
}

/// What deleting a referenced row does to rows pointing at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// The delete fails while referencing rows exist.
    Restrict,
    /// Referencing rows go with it. Only for unaudited tables.
    Cascade,
}

#[derive(Debug)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub on_delete: OnDelete,
}

/// Many-to-many join between two tables. The left side owns the links:
/// deleting a left row drops its links, deleting a linked right row fails.
#[derive(Debug)]
pub struct JoinTable {
    pub name: &'static str,
    pub left_table: &'static str,
    pub left: &'static str,
    pub right_table: &'static str,
    pub right: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const ALL: PageRequest = PageRequest {
        offset: 0,
        limit: u64::MAX,
    };
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction bound to the given audit identity.
    async fn begin(&self, scope: AuditScope) -> Result<Box<dyn Transaction>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// One unit of work. Dropping it without `commit` discards every change.
#[async_trait]
pub trait Transaction: Send {
    fn scope(&self) -> &AuditScope;

    async fn insert_row(&mut self, table: &'static TableDescriptor, row: Row)
        -> Result<Row, StoreError>;

    /// Replaces the row with the given id. `None` if it does not exist.
    async fn update_row(
        &mut self,
        table: &'static TableDescriptor,
        id: Uuid,
        row: Row,
    ) -> Result<Option<Row>, StoreError>;

    async fn delete_row(&mut self, table: &'static TableDescriptor, id: Uuid)
        -> Result<bool, StoreError>;

    async fn find_row(
        &mut self,
        table: &'static TableDescriptor,
        filter: &Filter,
    ) -> Result<Option<Row>, StoreError>;

    /// Matching rows in creation order, plus the total match count.
    async fn list_rows(
        &mut self,
        table: &'static TableDescriptor,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<(Vec<Row>, u64), StoreError>;

    /// Returns `false` when the pair was already linked.
    async fn link(&mut self, join: &'static JoinTable, left: Uuid, right: Uuid)
        -> Result<bool, StoreError>;

    async fn unlink(&mut self, join: &'static JoinTable, left: Uuid, right: Uuid)
        -> Result<bool, StoreError>;

    /// Right-hand ids linked to `left`.
    async fn linked(&mut self, join: &'static JoinTable, left: Uuid)
        -> Result<Vec<Uuid>, StoreError>;

    /// Left-hand ids linked to `right`.
    async fn linked_reverse(
        &mut self,
        join: &'static JoinTable,
        right: Uuid,
    ) -> Result<Vec<Uuid>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Reads the `id` column of a row.
pub fn row_id(row: &Row) -> Option<Uuid> {
    row.get("id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}
