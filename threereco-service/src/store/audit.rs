//! Audit writer. Every mutation of an audited table goes through
//! [`write`] inside the transaction performing it, so the record commits
//! or rolls back together with the change it describes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{record, StoreError, TableDescriptor, Transaction};
use crate::models::AuditLog;

/// Identity a transaction writes under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditScope {
    user_id: Option<Uuid>,
    ignore: bool,
}

impl AuditScope {
    /// Mutations are attributed to `user_id`.
    pub fn acting(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ignore: false,
        }
    }

    /// No identity: any audited mutation fails.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Skip audit records for this transaction (MFA secret and session
    /// bookkeeping).
    pub fn ignoring_audit(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

/// Appends one audit record for a mutation of `table`.
///
/// For `Delete` the caller passes the snapshot taken before the row is
/// removed.
pub async fn write(
    tx: &mut dyn Transaction,
    table: &'static TableDescriptor,
    operation: Operation,
    object_id: Uuid,
    data: Value,
) -> Result<(), StoreError> {
    if !table.audited {
        return Ok(());
    }

    if tx.scope().is_ignored() {
        tracing::debug!(table = table.name, %object_id, op = operation.as_str(), "Audit suppressed");
        return Ok(());
    }

    let user_id = tx
        .scope()
        .user_id()
        .ok_or(StoreError::AuditAttributionMissing(table.name))?;

    let entry = AuditLog {
        id: Uuid::new_v4(),
        table_name: table.name.to_string(),
        operation_type: operation,
        object_id,
        data,
        user_id,
        created_at: Utc::now(),
    };

    tx.insert_row(
        <AuditLog as record::Record>::TABLE,
        record::to_row(&entry)?,
    )
    .await?;

    tracing::debug!(
        table = table.name,
        %object_id,
        %user_id,
        op = operation.as_str(),
        "Audit record written"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Material, Notification};
    use crate::store::{record, Filter, MemoryStore, PageRequest, Store};

    fn material(name: &str) -> Material {
        Material::new(name.to_string(), format!("GW-{}", name), None)
    }

    async fn audit_rows(store: &MemoryStore) -> Vec<AuditLog> {
        let mut tx = store.begin(AuditScope::anonymous()).await.unwrap();
        let (rows, _) = record::list::<AuditLog>(&mut *tx, &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        rows
    }

    #[tokio::test]
    async fn test_insert_update_delete_each_write_one_record() {
        let store = MemoryStore::new();
        let actor = Uuid::new_v4();

        let mut tx = store.begin(AuditScope::acting(actor)).await.unwrap();
        let mut created = record::insert(&mut *tx, material("glass")).await.unwrap();
        created.name = "clear glass".to_string();
        let updated = record::update(&mut *tx, created).await.unwrap();
        record::delete(&mut *tx, &updated).await.unwrap();
        tx.commit().await.unwrap();

        let rows = audit_rows(&store).await;
        let ops: Vec<_> = rows.iter().map(|r| r.operation_type).collect();
        assert_eq!(ops, vec![Operation::Insert, Operation::Update, Operation::Delete]);
        assert!(rows.iter().all(|r| r.user_id == actor && r.table_name == "materials"));
        assert_eq!(rows[1].data["name"], "clear glass");
        // delete snapshot carries the last state
        assert_eq!(rows[2].data["name"], "clear glass");
    }

    #[tokio::test]
    async fn test_anonymous_mutation_fails_and_rolls_back() {
        let store = MemoryStore::new();

        let mut tx = store.begin(AuditScope::anonymous()).await.unwrap();
        let err = record::insert(&mut *tx, material("paper")).await.unwrap_err();
        assert!(matches!(err, StoreError::AuditAttributionMissing("materials")));
        drop(tx);

        let mut tx = store.begin(AuditScope::anonymous()).await.unwrap();
        let (materials, total) = record::list::<Material>(&mut *tx, &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        drop(tx);
        assert!(materials.is_empty());
        assert_eq!(total, 0);
        assert!(audit_rows(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_ignore_flag_skips_record() {
        let store = MemoryStore::new();

        let mut tx = store
            .begin(AuditScope::acting(Uuid::new_v4()).ignoring_audit())
            .await
            .unwrap();
        record::insert(&mut *tx, material("tin")).await.unwrap();
        tx.commit().await.unwrap();

        assert!(audit_rows(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_unaudited_table_needs_no_identity() {
        let store = MemoryStore::new();

        let mut tx = store.begin(AuditScope::anonymous()).await.unwrap();
        record::insert(
            &mut *tx,
            Notification::new(Uuid::new_v4(), "hello".into(), "world".into()),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(audit_rows(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_rolled_back_mutation_leaves_no_record() {
        let store = MemoryStore::new();

        let mut tx = store.begin(AuditScope::acting(Uuid::new_v4())).await.unwrap();
        record::insert(&mut *tx, material("steel")).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(audit_rows(&store).await.is_empty());
    }
}
