use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    row_id, AuditScope, Filter, ForeignKey, JoinTable, OnDelete, PageRequest, Row, Store,
    StoreError, TableDescriptor, Transaction,
};

#[derive(Debug, Clone)]
struct TableRows {
    table: &'static TableDescriptor,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: HashMap<&'static str, TableRows>,
    joins: HashMap<&'static str, (&'static JoinTable, Vec<(Uuid, Uuid)>)>,
}

impl MemoryState {
    fn contains(&self, table: &str, id: Uuid) -> bool {
        self.tables
            .get(table)
            .is_some_and(|t| t.rows.iter().any(|r| row_id(r) == Some(id)))
    }

    /// Every non-null reference of `row` must point at an existing row.
    fn check_references(&self, table: &TableDescriptor, row: &Row) -> Result<(), StoreError> {
        for fk in table.references {
            let Some(value) = row.get(fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let target = value.as_str().and_then(|s| Uuid::parse_str(s).ok());
            if !target.is_some_and(|id| self.contains(fk.table, id)) {
                return Err(StoreError::Referenced(format!("{}.{}", table.name, fk.column)));
            }
        }
        Ok(())
    }

    /// Applies the delete rules for `id` in `table`: fails on restricting
    /// references, otherwise drops cascading rows and owned join rows.
    fn release(&mut self, table: &TableDescriptor, id: Uuid) -> Result<(), StoreError> {
        let id_text = id.to_string();
        let points_at = |fk: &ForeignKey, row: &Row| {
            fk.table == table.name
                && row.get(fk.column).and_then(|v| v.as_str()) == Some(id_text.as_str())
        };

        for other in self.tables.values() {
            for fk in other.table.references {
                if fk.on_delete == OnDelete::Restrict && other.rows.iter().any(|r| points_at(fk, r)) {
                    return Err(StoreError::Referenced(format!("{}.{}", other.table.name, fk.column)));
                }
            }
        }
        for (join, pairs) in self.joins.values() {
            if join.right_table == table.name && pairs.iter().any(|(_, right)| *right == id) {
                return Err(StoreError::Referenced(format!("{}.{}", join.name, join.right)));
            }
        }

        for other in self.tables.values_mut() {
            let other_table = other.table;
            for fk in other_table.references {
                if fk.on_delete == OnDelete::Cascade {
                    other.rows.retain(|r| !points_at(fk, r));
                }
            }
        }
        for (join, pairs) in self.joins.values_mut() {
            if join.left_table == table.name {
                pairs.retain(|(left, _)| *left != id);
            }
        }
        Ok(())
    }
}

/// In-process store used by tests and local runs.
///
/// Transactions are serialized: `begin` holds the store until the
/// transaction commits, rolls back or is dropped. Work happens on a copy
/// that replaces the shared state on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self, scope: AuditScope) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            scope,
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    scope: AuditScope,
}

impl MemoryTransaction {
    fn rows(&mut self, table: &'static TableDescriptor) -> &mut Vec<Row> {
        &mut self
            .working
            .tables
            .entry(table.name)
            .or_insert_with(|| TableRows {
                table,
                rows: Vec::new(),
            })
            .rows
    }

    fn pairs(&mut self, join: &'static JoinTable) -> &mut Vec<(Uuid, Uuid)> {
        &mut self
            .working
            .joins
            .entry(join.name)
            .or_insert_with(|| (join, Vec::new()))
            .1
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

fn check_unique(table: &TableDescriptor, rows: &[Row], row: &Row) -> Result<(), StoreError> {
    let id = row_id(row);
    for column in table.unique {
        let Some(value) = row.get(*column).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = rows.iter().any(|existing| {
            row_id(existing) != id
                && existing
                    .get(*column)
                    .is_some_and(|other| same_value(other, value))
        });
        if taken {
            return Err(StoreError::Conflict(format!("{}.{}", table.name, column)));
        }
    }
    Ok(())
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn scope(&self) -> &AuditScope {
        &self.scope
    }

    async fn insert_row(
        &mut self,
        table: &'static TableDescriptor,
        row: Row,
    ) -> Result<Row, StoreError> {
        self.working.check_references(table, &row)?;
        let rows = self.rows(table);
        if row_id(&row).is_some_and(|id| rows.iter().any(|r| row_id(r) == Some(id))) {
            return Err(StoreError::Conflict(format!("{}.id", table.name)));
        }
        check_unique(table, rows, &row)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update_row(
        &mut self,
        table: &'static TableDescriptor,
        id: Uuid,
        mut row: Row,
    ) -> Result<Option<Row>, StoreError> {
        row.insert("id".to_string(), Value::String(id.to_string()));
        self.working.check_references(table, &row)?;
        let rows = self.rows(table);
        check_unique(table, rows, &row)?;
        match rows.iter_mut().find(|r| row_id(r) == Some(id)) {
            Some(existing) => {
                *existing = row.clone();
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    async fn delete_row(
        &mut self,
        table: &'static TableDescriptor,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        if !self.working.contains(table.name, id) {
            return Ok(false);
        }
        self.working.release(table, id)?;
        self.rows(table).retain(|r| row_id(r) != Some(id));
        Ok(true)
    }

    async fn find_row(
        &mut self,
        table: &'static TableDescriptor,
        filter: &Filter,
    ) -> Result<Option<Row>, StoreError> {
        Ok(self.rows(table).iter().find(|r| filter.matches(r)).cloned())
    }

    async fn list_rows(
        &mut self,
        table: &'static TableDescriptor,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<(Vec<Row>, u64), StoreError> {
        let matching: Vec<&Row> = self.rows(table).iter().filter(|r| filter.matches(r)).collect();
        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let rows = matching.into_iter().skip(offset).take(limit).cloned().collect();
        Ok((rows, total))
    }

    async fn link(
        &mut self,
        join: &'static JoinTable,
        left: Uuid,
        right: Uuid,
    ) -> Result<bool, StoreError> {
        if !self.working.contains(join.left_table, left) {
            return Err(StoreError::Referenced(format!("{}.{}", join.name, join.left)));
        }
        if !self.working.contains(join.right_table, right) {
            return Err(StoreError::Referenced(format!("{}.{}", join.name, join.right)));
        }
        let pairs = self.pairs(join);
        if pairs.contains(&(left, right)) {
            return Ok(false);
        }
        pairs.push((left, right));
        Ok(true)
    }

    async fn unlink(
        &mut self,
        join: &'static JoinTable,
        left: Uuid,
        right: Uuid,
    ) -> Result<bool, StoreError> {
        let pairs = self.pairs(join);
        let before = pairs.len();
        pairs.retain(|pair| *pair != (left, right));
        Ok(pairs.len() != before)
    }

    async fn linked(&mut self, join: &'static JoinTable, left: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .pairs(join)
            .iter()
            .filter(|(l, _)| *l == left)
            .map(|(_, r)| *r)
            .collect())
    }

    async fn linked_reverse(
        &mut self,
        join: &'static JoinTable,
        right: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .pairs(join)
            .iter()
            .filter(|(_, r)| *r == right)
            .map(|(l, _)| *l)
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BankDetails, Material, Notification, Organization, Role, User, UserType, USERS_ROLES,
    };
    use crate::store::{record, Record};

    #[tokio::test]
    async fn test_uncommitted_changes_are_invisible() {
        let store = MemoryStore::new();

        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();
        record::insert(&mut *tx, Material::new("can".into(), "GW1".into(), None))
            .await
            .unwrap();
        drop(tx);

        let mut tx = store.begin(AuditScope::anonymous()).await.unwrap();
        let (_, total) = record::list::<Material>(&mut *tx, &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_unique_columns_conflict_case_insensitively() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();

        record::insert(&mut *tx, Material::new("Glass".into(), "GW1".into(), None))
            .await
            .unwrap();
        let err = record::insert(&mut *tx, Material::new("glass".into(), "GW2".into(), None))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_paging_reports_total() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();
        for i in 0..5 {
            record::insert(&mut *tx, Material::new(format!("m{}", i), format!("GW{}", i), None))
                .await
                .unwrap();
        }

        let page = PageRequest { offset: 2, limit: 2 };
        let (rows, total) = record::list::<Material>(&mut *tx, &Filter::True, page)
            .await
            .unwrap();

        assert_eq!(total, 5);
        assert_eq!(rows.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), ["m2", "m3"]);
    }

    #[tokio::test]
    async fn test_delete_drops_owned_links_and_keeps_linked_children() {
        let store = MemoryStore::new();
        let actor = Uuid::new_v4();
        let mut tx = store.begin(AuditScope::acting(actor)).await.unwrap();

        let user = record::insert(
            &mut *tx,
            User::new("a@example.com".into(), "hash".into(), None, UserType::Collector),
        )
        .await
        .unwrap();
        let role = record::insert(&mut *tx, Role::new("Staff".into(), None, vec![]))
            .await
            .unwrap();
        tx.link(&USERS_ROLES, user.id(), role.id()).await.unwrap();

        let err = record::delete(&mut *tx, &role).await.unwrap_err();
        assert!(matches!(err, StoreError::Referenced(_)));

        record::delete(&mut *tx, &user).await.unwrap();
        assert!(tx.linked_reverse(&USERS_ROLES, role.id()).await.unwrap().is_empty());
        record::delete(&mut *tx, &role).await.unwrap();
    }

    #[tokio::test]
    async fn test_link_requires_both_rows() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();
        let role = record::insert(&mut *tx, Role::new("Staff".into(), None, vec![]))
            .await
            .unwrap();

        let err = tx.link(&USERS_ROLES, Uuid::new_v4(), role.id()).await.unwrap_err();
        assert!(matches!(err, StoreError::Referenced(_)));
    }

    #[tokio::test]
    async fn test_restricted_references_block_delete() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();

        let mut user = record::insert(
            &mut *tx,
            User::new("owner@example.com".into(), "hash".into(), None, UserType::Business),
        )
        .await
        .unwrap();
        let org = record::insert(
            &mut *tx,
            Organization::new("Acme".into(), "acme.example".into(), Some(user.id)),
        )
        .await
        .unwrap();
        user.primary_organization_id = Some(org.id);
        let user = record::update(&mut *tx, user).await.unwrap();
        let details = record::insert(
            &mut *tx,
            BankDetails::new(user.id, "Owner".into(), "12345678".into(), "Bank".into(), "001".into()),
        )
        .await
        .unwrap();

        let err = record::delete(&mut *tx, &org).await.unwrap_err();
        assert!(matches!(err, StoreError::Referenced(_)));
        let err = record::delete(&mut *tx, &user).await.unwrap_err();
        assert!(matches!(err, StoreError::Referenced(_)));

        let still_primary: User = record::find(&mut *tx, user.id, &Filter::True)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(still_primary.primary_organization_id, Some(org.id));

        record::delete(&mut *tx, &details).await.unwrap();
        let (_, remaining) = record::list::<BankDetails>(&mut *tx, &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_missing_reference_target_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();

        let orphan = BankDetails::new(
            Uuid::new_v4(),
            "Nobody".into(),
            "12345678".into(),
            "Bank".into(),
            "001".into(),
        );
        let err = record::insert(&mut *tx, orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::Referenced(_)));
    }

    #[tokio::test]
    async fn test_unaudited_dependents_cascade() {
        let store = MemoryStore::new();
        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();

        let user = record::insert(
            &mut *tx,
            User::new("reader@example.com".into(), "hash".into(), None, UserType::Collector),
        )
        .await
        .unwrap();
        record::insert(&mut *tx, Notification::new(user.id, "Hi".into(), "Welcome".into()))
            .await
            .unwrap();

        record::delete(&mut *tx, &user).await.unwrap();

        let (_, remaining) = record::list::<Notification>(&mut *tx, &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
