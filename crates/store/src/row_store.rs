use std::sync::Arc;

use crate::{Filter, Query, Row, StoreResult};

/// Table-oriented store reached through select / insert / update / delete.
///
/// Every call either returns data or a [`crate::StoreError`]; nothing is
/// retried here.
#[async_trait::async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>>;

    /// Insert rows, assigning an `id` to each.
    ///
    /// Stores may or may not echo the inserted rows back; callers must cope
    /// with an empty result.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>>;

    /// Merge `changes` into every matching row and return the updated rows.
    async fn update(&self, table: &str, changes: Row, filters: &[Filter]) -> StoreResult<Vec<Row>>;

    /// Delete matching rows. Deleting nothing is not an error.
    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()>;
}

#[async_trait::async_trait]
impl<S> RowStore for Arc<S>
where
    S: RowStore + ?Sized,
{
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        (**self).select(table, query).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        (**self).insert(table, rows).await
    }

    async fn update(&self, table: &str, changes: Row, filters: &[Filter]) -> StoreResult<Vec<Row>> {
        (**self).update(table, changes, filters).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()> {
        (**self).delete(table, filters).await
    }
}
