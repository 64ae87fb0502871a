//! Postgres backend. Rows travel as `jsonb` (`to_jsonb(t)` out,
//! `jsonb_populate_record` in), so one code path serves every table.
//! Table and column names come from static descriptors; filter columns
//! and values are always bound parameters.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPool, types::Json, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    AuditScope, Filter, JoinTable, PageRequest, Row, Store, StoreError, TableDescriptor,
    Transaction,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self, scope: AuditScope) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx, scope }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    scope: AuditScope,
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::True => {
            builder.push("TRUE");
        }
        Filter::Eq(column, value) => {
            builder.push("(to_jsonb(t) -> ");
            builder.push_bind(column.clone());
            builder.push(") = ");
            builder.push_bind(Json(value.clone()));
        }
        Filter::In(column, values) => {
            if values.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push("(to_jsonb(t) -> ");
            builder.push_bind(column.clone());
            builder.push(") IN (");
            let mut separated = builder.separated(", ");
            for value in values {
                separated.push_bind(Json(value.clone()));
            }
            separated.push_unseparated(")");
        }
        Filter::Like(column, term) => {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            builder.push("(to_jsonb(t) ->> ");
            builder.push_bind(column.clone());
            builder.push(") ILIKE ");
            builder.push_bind(format!("%{}%", escaped));
        }
        Filter::And(filters) | Filter::Or(filters) => {
            let (joiner, empty) = match filter {
                Filter::And(_) => (" AND ", "TRUE"),
                _ => (" OR ", "FALSE"),
            };
            if filters.is_empty() {
                builder.push(empty);
                return;
            }
            builder.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                push_filter(builder, inner);
            }
            builder.push(")");
        }
    }
}

fn into_row(value: Json<Value>) -> Result<Row, StoreError> {
    match value.0 {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(anyhow::anyhow!(
            "expected a row object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    fn scope(&self) -> &AuditScope {
        &self.scope
    }

    async fn insert_row(
        &mut self,
        table: &'static TableDescriptor,
        row: Row,
    ) -> Result<Row, StoreError> {
        let name = quote(table.name);
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {name} AS t SELECT * FROM jsonb_populate_record(NULL::{name}, "
        ));
        builder.push_bind(Json(Value::Object(row)));
        builder.push(") RETURNING to_jsonb(t)");

        let stored = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_one(&mut *self.tx)
            .await?;
        into_row(stored)
    }

    async fn update_row(
        &mut self,
        table: &'static TableDescriptor,
        id: Uuid,
        row: Row,
    ) -> Result<Option<Row>, StoreError> {
        let columns: Vec<String> = row.keys().filter(|k| *k != "id").map(|k| quote(k)).collect();
        if columns.is_empty() {
            return Err(StoreError::Backend(anyhow::anyhow!("update without columns")));
        }
        let column_list = columns.join(", ");
        let name = quote(table.name);

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {name} AS t SET ({column_list}) = (SELECT {column_list} FROM jsonb_populate_record(NULL::{name}, "
        ));
        builder.push_bind(Json(Value::Object(row)));
        builder.push(")) WHERE t.id = ");
        builder.push_bind(id);
        builder.push(" RETURNING to_jsonb(t)");

        let stored = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_optional(&mut *self.tx)
            .await?;
        stored.map(into_row).transpose()
    }

    async fn delete_row(
        &mut self,
        table: &'static TableDescriptor,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", quote(table.name));
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_row(
        &mut self,
        table: &'static TableDescriptor,
        filter: &Filter,
    ) -> Result<Option<Row>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT to_jsonb(t) FROM {} t WHERE ",
            quote(table.name)
        ));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY t.created_at, t.id LIMIT 1");

        let found = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_optional(&mut *self.tx)
            .await?;
        found.map(into_row).transpose()
    }

    async fn list_rows(
        &mut self,
        table: &'static TableDescriptor,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<(Vec<Row>, u64), StoreError> {
        let name = quote(table.name);

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {name} t WHERE "));
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.tx)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT to_jsonb(t) FROM {name} t WHERE "));
        push_filter(&mut select, filter);
        select.push(" ORDER BY t.created_at, t.id");
        if page.limit != u64::MAX {
            select.push(" LIMIT ");
            select.push_bind(i64::try_from(page.limit).unwrap_or(i64::MAX));
        }
        select.push(" OFFSET ");
        select.push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

        let rows = select
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(into_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, u64::try_from(total).unwrap_or(0)))
    }

    async fn link(
        &mut self,
        join: &'static JoinTable,
        left: Uuid,
        right: Uuid,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            quote(join.name),
            quote(join.left),
            quote(join.right)
        );
        let result = sqlx::query(&sql)
            .bind(left)
            .bind(right)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unlink(
        &mut self,
        join: &'static JoinTable,
        left: Uuid,
        right: Uuid,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            quote(join.name),
            quote(join.left),
            quote(join.right)
        );
        let result = sqlx::query(&sql)
            .bind(left)
            .bind(right)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn linked(&mut self, join: &'static JoinTable, left: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            quote(join.right),
            quote(join.name),
            quote(join.left)
        );
        Ok(sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(left)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn linked_reverse(
        &mut self,
        join: &'static JoinTable,
        right: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            quote(join.left),
            quote(join.name),
            quote(join.right)
        );
        Ok(sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(right)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
