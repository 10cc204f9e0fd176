use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde_json::Value;

use dealflow_core::RecordId;

use crate::error::{StoreError, StoreResult};
use crate::{Filter, Query, Row, RowStore};

/// In-memory row store for dev and tests.
///
/// Rows keep insertion order per table. Unique constraints are opt-in via
/// [`InMemoryRowStore::with_unique`]; without them the store accepts
/// duplicate values just like a table with no index.
#[derive(Debug)]
pub struct InMemoryRowStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    unique: HashSet<(String, String)>,
    echo_inserts: bool,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            unique: HashSet::new(),
            echo_inserts: true,
        }
    }

    /// Enforce uniqueness of `column` within `table`.
    pub fn with_unique(mut self, table: &str, column: &str) -> Self {
        self.unique.insert((table.to_string(), column.to_string()));
        self
    }

    /// Stop returning inserted rows from [`RowStore::insert`].
    pub fn without_insert_echo(mut self) -> Self {
        self.echo_inserts = false;
        self
    }

    fn unique_columns<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.unique
            .iter()
            .filter(move |(t, _)| t == table)
            .map(|(_, c)| c.as_str())
    }

    fn violation(table: &str, column: &str) -> StoreError {
        StoreError::UniqueViolation {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Check `candidate` against `existing` (skipping `skip_id`) for every
    /// unique column it carries a non-null value for.
    fn check_unique(
        &self,
        table: &str,
        existing: &[Row],
        candidate: &Row,
        skip_id: Option<&Value>,
    ) -> StoreResult<()> {
        for column in self.unique_columns(table) {
            let Some(value) = candidate.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = existing.iter().any(|row| {
                row.get(column) == Some(value) && skip_id.is_none_or(|id| row.get("id") != Some(id))
            });
            if clash {
                return Err(Self::violation(table, column));
            }
        }
        Ok(())
    }
}

impl Default for InMemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::backend("in-memory store lock poisoned")
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // Nulls sort last ascending.
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl RowStore for InMemoryRowStore {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            // Ids are UUIDv7, so they break ties in insertion order.
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column))
                    .then_with(|| compare(a.get("id"), b.get("id")));
                if order.descending { ord.reverse() } else { ord }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let existing = tables.entry(table.to_string()).or_default();

        // Validate the whole batch before writing so a violation inserts nothing.
        let mut staged: Vec<Row> = Vec::with_capacity(rows.len());
        for mut row in rows {
            if !row.contains_key("id") {
                row.insert("id".to_string(), Value::String(RecordId::new().to_string()));
            }
            self.check_unique(table, existing.as_slice(), &row, None)?;
            self.check_unique(table, &staged, &row, None)?;
            staged.push(row);
        }

        existing.extend(staged.iter().cloned());
        tracing::debug!(table, count = staged.len(), "rows inserted");

        Ok(if self.echo_inserts { staged } else { Vec::new() })
    }

    async fn update(&self, table: &str, mut changes: Row, filters: &[Filter]) -> StoreResult<Vec<Row>> {
        changes.remove("id");

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let Some(existing) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let targets: Vec<usize> = existing
            .iter()
            .enumerate()
            .filter(|(_, r)| filters.iter().all(|f| f.matches(r)))
            .map(|(i, _)| i)
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for &i in &targets {
            let mut row = existing[i].clone();
            row.extend(changes.clone());
            self.check_unique(table, existing.as_slice(), &row, row.get("id"))?;
            updated.push((i, row));
        }

        for (i, row) in &updated {
            existing[*i] = row.clone();
        }
        Ok(updated.into_iter().map(|(_, r)| r).collect())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if let Some(rows) = tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|r| !filters.iter().all(|f| f.matches(r)));
            tracing::debug!(table, removed = before - rows.len(), "rows deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_echoes() {
        let store = InMemoryRowStore::new();
        let inserted = store
            .insert("leads", vec![row(json!({ "email": "a@example.com" }))])
            .await
            .unwrap();

        assert_eq!(inserted.len(), 1);
        let id = inserted[0]["id"].as_str().unwrap();
        assert!(id.parse::<RecordId>().is_ok());
    }

    #[tokio::test]
    async fn insert_without_echo_returns_nothing_but_stores() {
        let store = InMemoryRowStore::new().without_insert_echo();
        let inserted = store
            .insert("leads", vec![row(json!({ "email": "a@example.com" }))])
            .await
            .unwrap();
        assert!(inserted.is_empty());

        let all = store.select("leads", &Query::all()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn select_filters_and_orders_descending() {
        let store = InMemoryRowStore::new();
        store
            .insert(
                "opportunities",
                vec![
                    row(json!({ "title": "a", "created": "2024-01-01T00:00:00.000Z" })),
                    row(json!({ "title": "b", "created": "2024-03-01T00:00:00.000Z" })),
                    row(json!({ "title": "c", "created": "2024-02-01T00:00:00.000Z" })),
                ],
            )
            .await
            .unwrap();

        let rows = store
            .select("opportunities", &Query::all().order_desc("created"))
            .await
            .unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["b", "c", "a"]);

        let rows = store
            .select("opportunities", &Query::all().eq("title", "c"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn equal_sort_keys_fall_back_to_insertion_order() {
        let store = InMemoryRowStore::new();
        for name in ["first", "second", "third"] {
            store
                .insert("leads", vec![row(json!({ "name": name, "created": "2024-01-01T00:00:00.000Z" }))])
                .await
                .unwrap();
        }

        let rows = store
            .select("leads", &Query::all().order_desc("created"))
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn unknown_table_is_empty() {
        let store = InMemoryRowStore::new();
        assert!(store.select("nothing", &Query::all()).await.unwrap().is_empty());
        store.delete("nothing", &[Filter::eq("id", "x")]).await.unwrap();
    }

    #[tokio::test]
    async fn unique_constraint_rejects_duplicates_atomically() {
        let store = InMemoryRowStore::new().with_unique("investors", "email");
        store
            .insert("investors", vec![row(json!({ "email": "a@example.com" }))])
            .await
            .unwrap();

        let err = store
            .insert(
                "investors",
                vec![
                    row(json!({ "email": "b@example.com" })),
                    row(json!({ "email": "a@example.com" })),
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                table: "investors".into(),
                column: "email".into()
            }
        );

        let all = store.select("investors", &Query::all()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn duplicates_allowed_without_constraint() {
        let store = InMemoryRowStore::new();
        for _ in 0..2 {
            store
                .insert("investors", vec![row(json!({ "email": "a@example.com" }))])
                .await
                .unwrap();
        }
        assert_eq!(store.select("investors", &Query::all()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_id() {
        let store = InMemoryRowStore::new();
        let inserted = store
            .insert("opportunities", vec![row(json!({ "title": "Deal", "stage": "new" }))])
            .await
            .unwrap();
        let id = inserted[0]["id"].clone();

        let updated = store
            .update(
                "opportunities",
                row(json!({ "stage": "review", "id": "hijack" })),
                &[Filter::Eq("id".into(), id.clone())],
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["stage"], "review");
        assert_eq!(updated[0]["title"], "Deal");
        assert_eq!(updated[0]["id"], id);
    }

    #[tokio::test]
    async fn update_respects_unique_constraint() {
        let store = InMemoryRowStore::new().with_unique("opportunities", "title");
        let inserted = store
            .insert(
                "opportunities",
                vec![row(json!({ "title": "One" })), row(json!({ "title": "Two" }))],
            )
            .await
            .unwrap();
        let second = inserted[1]["id"].clone();

        // Renaming a row to its own title is fine.
        store
            .update("opportunities", row(json!({ "title": "Two" })), &[Filter::Eq("id".into(), second.clone())])
            .await
            .unwrap();

        let err = store
            .update("opportunities", row(json!({ "title": "One" })), &[Filter::Eq("id".into(), second)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryRowStore::new();
        let inserted = store
            .insert("leads", vec![row(json!({ "email": "a@example.com" }))])
            .await
            .unwrap();
        let id = inserted[0]["id"].clone();

        store.delete("leads", &[Filter::Eq("id".into(), id.clone())]).await.unwrap();
        store.delete("leads", &[Filter::Eq("id".into(), id)]).await.unwrap();
        assert!(store.select("leads", &Query::all()).await.unwrap().is_empty());
    }
}
