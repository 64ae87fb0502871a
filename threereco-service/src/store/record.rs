//! Typed data-access primitives. Each mutating primitive writes its audit
//! record before returning.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{
    audit::{self, Operation},
    naming, Filter, JoinTable, PageRequest, Row, StoreError, TableDescriptor, Transaction,
};

/// An entity persisted in one table.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static TableDescriptor;

    /// Serialized fields that never appear in responses or audit data.
    const SECRET_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> Uuid;

    /// Update bookkeeping applied before every write.
    fn touch(&mut self, modified_by: Option<Uuid>, at: DateTime<Utc>);

    /// Canonical lowerCamelCase JSON without secret fields.
    fn public_json(&self) -> Result<Value, StoreError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            for field in Self::SECRET_FIELDS {
                map.remove(*field);
            }
        }
        Ok(value)
    }
}

pub fn to_row<R: Record>(record: &R) -> Result<Row, StoreError> {
    naming::object_to_row(serde_json::to_value(record)?).ok_or_else(|| {
        StoreError::Backend(anyhow::anyhow!(
            "{} record did not serialize to an object",
            R::TABLE.name
        ))
    })
}

pub fn from_row<R: Record>(row: Row) -> Result<R, StoreError> {
    Ok(serde_json::from_value(naming::row_to_object(row))?)
}

pub async fn insert<R: Record>(tx: &mut dyn Transaction, mut record: R) -> Result<R, StoreError> {
    record.touch(tx.scope().user_id(), Utc::now());

    let stored: R = from_row(tx.insert_row(R::TABLE, to_row(&record)?).await?)?;
    audit::write(tx, R::TABLE, Operation::Insert, stored.id(), stored.public_json()?).await?;

    Ok(stored)
}

pub async fn update<R: Record>(tx: &mut dyn Transaction, mut record: R) -> Result<R, StoreError> {
    record.touch(tx.scope().user_id(), Utc::now());
    let id = record.id();

    let stored: R = match tx.update_row(R::TABLE, id, to_row(&record)?).await? {
        Some(row) => from_row(row)?,
        None => return Err(StoreError::Missing(R::TABLE.name, id)),
    };
    audit::write(tx, R::TABLE, Operation::Update, id, stored.public_json()?).await?;

    Ok(stored)
}

/// Audits the pre-delete snapshot, then removes the row.
pub async fn delete<R: Record>(tx: &mut dyn Transaction, record: &R) -> Result<(), StoreError> {
    let id = record.id();
    audit::write(tx, R::TABLE, Operation::Delete, id, record.public_json()?).await?;

    if !tx.delete_row(R::TABLE, id).await? {
        return Err(StoreError::Missing(R::TABLE.name, id));
    }

    Ok(())
}

/// Fetches by id, restricted to rows matching `scope`.
pub async fn find<R: Record>(
    tx: &mut dyn Transaction,
    id: Uuid,
    scope: &Filter,
) -> Result<Option<R>, StoreError> {
    find_by(tx, &Filter::and([Filter::id(id), scope.clone()])).await
}

pub async fn find_by<R: Record>(
    tx: &mut dyn Transaction,
    filter: &Filter,
) -> Result<Option<R>, StoreError> {
    tx.find_row(R::TABLE, filter)
        .await?
        .map(from_row::<R>)
        .transpose()
}

pub async fn list<R: Record>(
    tx: &mut dyn Transaction,
    filter: &Filter,
    page: PageRequest,
) -> Result<(Vec<R>, u64), StoreError> {
    let (rows, total) = tx.list_rows(R::TABLE, filter, page).await?;
    let records = rows.into_iter().map(from_row).collect::<Result<Vec<R>, _>>()?;
    Ok((records, total))
}

pub async fn find_many<R: Record>(
    tx: &mut dyn Transaction,
    ids: &[Uuid],
) -> Result<Vec<R>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let filter = Filter::one_of("id", ids.iter().map(|id| id.to_string()));
    Ok(list(tx, &filter, PageRequest::ALL).await?.0)
}

/// Links `child` to `parent`; a new link is audited as an update of the
/// parent whose snapshot lists the linked ids under `field`.
pub async fn link<P: Record>(
    tx: &mut dyn Transaction,
    join: &'static JoinTable,
    field: &'static str,
    parent: &P,
    child: Uuid,
) -> Result<bool, StoreError> {
    let added = tx.link(join, parent.id(), child).await?;
    if added {
        audit_association(tx, join, field, parent).await?;
    }
    Ok(added)
}

pub async fn unlink<P: Record>(
    tx: &mut dyn Transaction,
    join: &'static JoinTable,
    field: &'static str,
    parent: &P,
    child: Uuid,
) -> Result<bool, StoreError> {
    let removed = tx.unlink(join, parent.id(), child).await?;
    if removed {
        audit_association(tx, join, field, parent).await?;
    }
    Ok(removed)
}

async fn audit_association<P: Record>(
    tx: &mut dyn Transaction,
    join: &'static JoinTable,
    field: &'static str,
    parent: &P,
) -> Result<(), StoreError> {
    let ids = tx.linked(join, parent.id()).await?;
    let mut data = parent.public_json()?;
    if let Value::Object(map) = &mut data {
        map.insert(field.to_string(), json!(ids));
    }
    audit::write(tx, P::TABLE, Operation::Update, parent.id(), data).await
}
