//! Postgres-backed row store.
//!
//! Each table holds `(id uuid, doc jsonb)`; filters and ordering run against
//! the jsonb document. Natural keys are protected by unique expression
//! indexes named `<table>_<column>_key` (see `migrations/`), so a duplicate
//! insert surfaces as [`StoreError::UniqueViolation`] even when two writers
//! race past the handler's existence check.

use std::sync::Arc;

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};
use uuid::Uuid;

use dealflow_core::RecordId;

use crate::error::{StoreError, StoreResult, check_identifier};
use crate::{Filter, Query, Row, RowStore};

const MIGRATION: &str = include_str!("../migrations/0001_crm_tables.sql");

/// Row store over a SQLx Postgres pool.
///
/// The pool is thread-safe (Arc + Send + Sync); the store is cheap to share.
#[derive(Debug, Clone)]
pub struct PostgresRowStore {
    pool: Arc<PgPool>,
}

impl PostgresRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("", e))?;
        Ok(Self::new(pool))
    }

    /// Create the CRM tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(MIGRATION)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("", e))?;
        Ok(())
    }
}

/// Translate unique violations (SQLSTATE 23505) into the store taxonomy.
fn map_sqlx_error(table: &str, err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.code().as_deref() == Some("23505") {
            let constraint = db.constraint().unwrap_or_default();
            let column = constraint
                .strip_prefix(table)
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|rest| rest.strip_suffix("_key"))
                .unwrap_or(constraint);
            return StoreError::UniqueViolation {
                table: table.to_string(),
                column: column.to_string(),
            };
        }
    }
    StoreError::Backend(err.to_string())
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) -> StoreResult<()> {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        let column = check_identifier(filter.column())?;
        let (op, value) = match filter {
            Filter::Eq(_, v) => ("= ", v),
            Filter::Ne(_, v) => ("IS DISTINCT FROM ", v),
        };
        if column == "id" {
            qb.push("id::text ").push(op).push_bind(id_text(value));
        } else {
            qb.push(format!("doc -> '{column}' "))
                .push(op)
                .push_bind(Json(value.clone()));
        }
    }
    Ok(())
}

fn decode(row: &PgRow) -> StoreResult<Row> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| StoreError::backend(format!("failed to read id: {e}")))?;
    let Json(mut doc): Json<Row> = row
        .try_get("doc")
        .map_err(|e| StoreError::backend(format!("failed to read doc: {e}")))?;
    doc.insert("id".to_string(), Value::String(id.to_string()));
    Ok(doc)
}

#[async_trait::async_trait]
impl RowStore for PostgresRowStore {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let table = check_identifier(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT id, doc FROM {table}"));
        push_filters(&mut qb, &query.filters)?;

        if let Some(order) = &query.order {
            let column = check_identifier(&order.column)?;
            let dir = if order.descending { "DESC" } else { "ASC" };
            if column == "id" {
                qb.push(format!(" ORDER BY id {dir}"));
            } else {
                qb.push(format!(" ORDER BY doc -> '{column}' {dir}, id {dir}"));
            }
        }

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;
        rows.iter().map(decode).collect()
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        let table = check_identifier(table)?;
        let sql = format!("INSERT INTO {table} (id, doc) VALUES ($1, $2) RETURNING id, doc");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(table, e))?;

        let mut inserted = Vec::with_capacity(rows.len());
        for mut row in rows {
            let id: Uuid = match row.remove("id") {
                Some(Value::String(s)) => Uuid::parse_str(&s)
                    .map_err(|e| StoreError::backend(format!("invalid id {s}: {e}")))?,
                _ => RecordId::new().into(),
            };
            let record = sqlx::query(&sql)
                .bind(id)
                .bind(Json(row))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(table, e))?;
            inserted.push(decode(&record)?);
        }

        tx.commit().await.map_err(|e| map_sqlx_error(table, e))?;
        tracing::debug!(table, count = inserted.len(), "rows inserted");
        Ok(inserted)
    }

    async fn update(&self, table: &str, mut changes: Row, filters: &[Filter]) -> StoreResult<Vec<Row>> {
        let table = check_identifier(table)?;
        changes.remove("id");

        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {table} SET doc = doc || "));
        qb.push_bind(Json(changes));
        push_filters(&mut qb, filters)?;
        qb.push(" RETURNING id, doc");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;
        rows.iter().map(decode).collect()
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()> {
        let table = check_identifier(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {table}"));
        push_filters(&mut qb, filters)?;

        let result = qb
            .build()
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;
        tracing::debug!(table, removed = result.rows_affected(), "rows deleted");
        Ok(())
    }
}
