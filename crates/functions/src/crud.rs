//! Generic create / list / delete / patch function for a CRM resource.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use dealflow_core::{DomainError, time::now_iso, validation::as_object};
use dealflow_crm::{CREATED_FIELD, ID_FIELD, Resource, Row};
use dealflow_store::{Filter, Query, RowStore, StoreError};

use crate::error::{FunctionError, settle};
use crate::{
    FunctionHandler, HandlerOutput, HttpMethod, InvocationContext, InvocationEvent, InvocationResult,
    WorkflowNotifier,
};

type Outcome = Result<InvocationResult, FunctionError>;

/// CRUD function over one [`Resource`] table.
///
/// - `POST`: validate, reject duplicates of the natural key, insert, `201`.
/// - `GET`: every record, newest first.
/// - `DELETE`: remove by `id`; idempotent.
/// - `PATCH`: partial update, for resources that allow it.
pub struct CrudHandler<R> {
    store: Arc<dyn RowStore>,
    notifier: Option<WorkflowNotifier>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> CrudHandler<R> {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            notifier: None,
            _resource: PhantomData,
        }
    }

    /// Announce every created record to the workflow worker.
    pub fn with_notifier(mut self, notifier: WorkflowNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn handle(&self, event: &InvocationEvent) -> anyhow::Result<InvocationResult> {
        let outcome = match event.method() {
            HttpMethod::Post => self.create(event).await,
            HttpMethod::Get => self.list().await,
            HttpMethod::Delete => self.delete(event).await,
            HttpMethod::Patch if R::PATCHABLE => self.patch(event).await,
            _ => Err(FunctionError::MethodNotAllowed),
        };
        settle(outcome)
    }

    fn duplicate() -> FunctionError {
        DomainError::duplicate(R::SINGULAR, R::NATURAL_KEY).into()
    }

    fn conflict_or_store(err: StoreError) -> FunctionError {
        match err {
            StoreError::UniqueViolation { .. } => Self::duplicate(),
            other => FunctionError::Store(other),
        }
    }

    async fn create(&self, event: &InvocationEvent) -> Outcome {
        let payload = parse_body(event)?;
        let record = R::from_payload(&payload)?;

        let existing = self
            .store
            .select(R::TABLE, &Query::all().eq(R::NATURAL_KEY, record.natural_key()))
            .await?;
        if !existing.is_empty() {
            return Err(Self::duplicate());
        }

        let row = record
            .to_row(&now_iso())
            .map_err(|e| anyhow::Error::new(e).context(format!("serializing {}", R::SINGULAR)))?;
        let inserted = self
            .store
            .insert(R::TABLE, vec![row.clone()])
            .await
            .map_err(Self::conflict_or_store)?;

        // Stores that do not echo inserts get the locally built row back.
        let stored = inserted.into_iter().next().unwrap_or(row);
        let id = stored.get(ID_FIELD).and_then(|v| v.as_str()).unwrap_or_default();
        tracing::info!(resource = R::SINGULAR, id, "record created");

        if let Some(notifier) = &self.notifier {
            notifier.notify(R::SINGULAR, Value::Object(stored.clone()));
        }

        Ok(InvocationResult::json(
            201,
            message_with(format!("{} created", R::LABEL), R::SINGULAR, Value::Object(stored)),
        ))
    }

    async fn list(&self) -> Outcome {
        let rows = self
            .store
            .select(R::TABLE, &Query::all().order_desc(CREATED_FIELD))
            .await?;

        let mut body = Map::new();
        body.insert(
            R::PLURAL.to_string(),
            Value::Array(rows.into_iter().map(Value::Object).collect()),
        );
        Ok(InvocationResult::json(200, Value::Object(body)))
    }

    async fn delete(&self, event: &InvocationEvent) -> Outcome {
        let payload = parse_body(event)?;
        let id = required_id(as_object(&payload)?)
            .ok_or_else(|| FunctionError::Validation(vec!["Id is required".to_string()]))?;

        self.store
            .delete(R::TABLE, &[Filter::Eq(ID_FIELD.to_string(), id.clone())])
            .await?;

        Ok(InvocationResult::json(
            200,
            message_with(format!("{} deleted", R::LABEL), ID_FIELD, id),
        ))
    }

    async fn patch(&self, event: &InvocationEvent) -> Outcome {
        let payload = parse_body(event)?;
        let mut fields: Row = as_object(&payload)?.clone();
        let id = fields.remove(ID_FIELD).filter(|v| !v.is_null());

        let mut violations = Vec::new();
        if id.is_none() {
            violations.push("Id is required".to_string());
        }
        let changes = match R::validate_patch(&fields) {
            Ok(changes) => Some(changes),
            Err(err) => {
                violations.extend(err.messages());
                None
            }
        };
        let (Some(id), Some(changes), true) = (id, changes, violations.is_empty()) else {
            return Err(FunctionError::Validation(violations));
        };

        if let Some(key) = changes.get(R::NATURAL_KEY) {
            let clash = self
                .store
                .select(
                    R::TABLE,
                    &Query::all()
                        .eq(R::NATURAL_KEY, key.clone())
                        .ne(ID_FIELD, id.clone()),
                )
                .await?;
            if !clash.is_empty() {
                return Err(Self::duplicate());
            }
        }

        let updated = self
            .store
            .update(R::TABLE, changes, &[Filter::Eq(ID_FIELD.to_string(), id)])
            .await
            .map_err(Self::conflict_or_store)?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("{} not found", R::LABEL)))?;

        Ok(InvocationResult::json(
            200,
            message_with(format!("{} updated", R::LABEL), R::SINGULAR, Value::Object(row)),
        ))
    }
}

#[async_trait::async_trait]
impl<R: Resource> FunctionHandler for CrudHandler<R> {
    async fn call(&self, event: InvocationEvent, _ctx: InvocationContext) -> anyhow::Result<HandlerOutput> {
        self.handle(&event).await.map(HandlerOutput::Response)
    }
}

fn parse_body(event: &InvocationEvent) -> Result<Value, FunctionError> {
    event.json_body().map_err(|_| FunctionError::InvalidJson)
}

fn required_id(fields: &Row) -> Option<Value> {
    fields.get(ID_FIELD).filter(|v| !v.is_null()).cloned()
}

fn message_with(message: String, key: &str, value: Value) -> Value {
    let mut body = Map::new();
    body.insert("message".to_string(), Value::String(message));
    body.insert(key.to_string(), value);
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_crm::{Investor, Lead, Opportunity};
    use dealflow_store::{InMemoryRowStore, StoreResult};
    use serde_json::json;

    fn post(body: Value) -> InvocationEvent {
        InvocationEvent::new(HttpMethod::Post, "/fn").with_body(body.to_string())
    }

    fn body(result: &InvocationResult) -> Value {
        serde_json::from_str(&result.body.clone().into_text()).unwrap()
    }

    fn investors(store: Arc<dyn RowStore>) -> CrudHandler<Investor> {
        CrudHandler::new(store)
    }

    /// Store whose every call fails, for the 500 paths.
    struct BrokenStore;

    #[async_trait::async_trait]
    impl RowStore for BrokenStore {
        async fn select(&self, _: &str, _: &Query) -> StoreResult<Vec<Row>> {
            Err(StoreError::backend("connection refused"))
        }
        async fn insert(&self, _: &str, _: Vec<Row>) -> StoreResult<Vec<Row>> {
            Err(StoreError::backend("connection refused"))
        }
        async fn update(&self, _: &str, _: Row, _: &[Filter]) -> StoreResult<Vec<Row>> {
            Err(StoreError::backend("connection refused"))
        }
        async fn delete(&self, _: &str, _: &[Filter]) -> StoreResult<()> {
            Err(StoreError::backend("connection refused"))
        }
    }

    #[tokio::test]
    async fn create_then_duplicate_then_invalid() {
        let handler = investors(Arc::new(InMemoryRowStore::new()));

        let created = handler
            .handle(&post(json!({ "name": "Investor Alpha", "email": "alpha@example.com", "accredited": true })))
            .await
            .unwrap();
        assert_eq!(created.status_code, 201);
        let created = body(&created);
        assert_eq!(created["message"], "Investor created");
        assert_eq!(created["investor"]["name"], "Investor Alpha");
        assert!(created["investor"]["created"].is_string());
        assert!(created["investor"]["id"].is_string());

        let dup = handler
            .handle(&post(json!({ "name": "Investor Beta", "email": "alpha@example.com" })))
            .await
            .unwrap();
        assert_eq!(dup.status_code, 409);
        assert_eq!(body(&dup), json!({ "error": "Duplicate investor email" }));

        let invalid = handler
            .handle(&post(json!({ "name": "Investor Gamma", "email": "gamma@example.com", "accredited": "yes" })))
            .await
            .unwrap();
        assert_eq!(invalid.status_code, 400);
        assert_eq!(body(&invalid), json!({ "error": ["Accredited must be boolean"] }));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let handler = investors(Arc::new(InMemoryRowStore::new()));
        let event = InvocationEvent::new(HttpMethod::Post, "/fn").with_body("{oops");
        let result = handler.handle(&event).await.unwrap();
        assert_eq!(result.status_code, 400);
        assert_eq!(body(&result), json!({ "error": "Invalid JSON body" }));
    }

    /// Store whose reads never see existing rows, as when two writers race
    /// past the existence check.
    struct BlindStore(InMemoryRowStore);

    #[async_trait::async_trait]
    impl RowStore for BlindStore {
        async fn select(&self, _: &str, _: &Query) -> StoreResult<Vec<Row>> {
            Ok(Vec::new())
        }
        async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
            self.0.insert(table, rows).await
        }
        async fn update(&self, table: &str, changes: Row, filters: &[Filter]) -> StoreResult<Vec<Row>> {
            self.0.update(table, changes, filters).await
        }
        async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()> {
            self.0.delete(table, filters).await
        }
    }

    #[tokio::test]
    async fn store_uniqueness_closes_the_race() {
        let store = BlindStore(InMemoryRowStore::new().with_unique("investors", "email"));
        let handler = investors(Arc::new(store));
        let payload = json!({ "name": "A", "email": "a@example.com" });

        assert_eq!(handler.handle(&post(payload.clone())).await.unwrap().status_code, 201);
        let second = handler.handle(&post(payload)).await.unwrap();
        assert_eq!(second.status_code, 409);
        assert_eq!(body(&second), json!({ "error": "Duplicate investor email" }));
    }

    #[tokio::test]
    async fn falls_back_to_local_row_without_echo() {
        let handler = investors(Arc::new(InMemoryRowStore::new().without_insert_echo()));
        let result = handler
            .handle(&post(json!({ "name": "Quiet", "email": "quiet@example.com", "extra": 1 })))
            .await
            .unwrap();
        assert_eq!(result.status_code, 201);
        let investor = &body(&result)["investor"];
        assert_eq!(investor["email"], "quiet@example.com");
        assert!(investor["created"].is_string());
        assert!(investor.get("extra").is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let handler = CrudHandler::<Lead>::new(Arc::new(InMemoryRowStore::new()));
        for email in ["one@example.com", "two@example.com"] {
            handler.handle(&post(json!({ "name": "L", "email": email }))).await.unwrap();
        }

        let result = handler
            .handle(&InvocationEvent::new(HttpMethod::Get, "/fn"))
            .await
            .unwrap();
        assert_eq!(result.status_code, 200);
        let leads = body(&result)["leads"].as_array().cloned().unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0]["email"], "two@example.com");
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_needs_an_id() {
        let handler = investors(Arc::new(InMemoryRowStore::new()));
        let delete = |b: Value| InvocationEvent::new(HttpMethod::Delete, "/fn").with_body(b.to_string());

        let result = handler.handle(&delete(json!({ "id": "nope" }))).await.unwrap();
        assert_eq!(result.status_code, 200);
        assert_eq!(body(&result), json!({ "message": "Investor deleted", "id": "nope" }));

        let result = handler.handle(&delete(json!({}))).await.unwrap();
        assert_eq!(result.status_code, 400);
        assert_eq!(body(&result), json!({ "error": ["Id is required"] }));
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let handler = investors(Arc::new(InMemoryRowStore::new()));
        for method in [HttpMethod::Put, HttpMethod::Patch] {
            let result = handler.handle(&InvocationEvent::new(method, "/fn")).await.unwrap();
            assert_eq!(result.status_code, 405);
            assert_eq!(body(&result), json!({ "error": "Method not allowed" }));
        }
    }

    #[tokio::test]
    async fn store_errors_surface_as_500() {
        let handler = investors(Arc::new(BrokenStore));
        let result = handler
            .handle(&post(json!({ "name": "A", "email": "a@example.com" })))
            .await
            .unwrap();
        assert_eq!(result.status_code, 500);
        assert_eq!(body(&result), json!({ "error": "connection refused" }));

        let result = handler
            .handle(&InvocationEvent::new(HttpMethod::Get, "/fn"))
            .await
            .unwrap();
        assert_eq!(result.status_code, 500);
    }

    #[tokio::test]
    async fn lead_creation_notifies_the_workflow() {
        let (notifier, mut rx) = WorkflowNotifier::channel();
        let handler = CrudHandler::<Lead>::new(Arc::new(InMemoryRowStore::new())).with_notifier(notifier);

        let result = handler
            .handle(&post(json!({ "name": "Lee", "email": "lee@example.com" })))
            .await
            .unwrap();
        assert_eq!(result.status_code, 201);
        assert_eq!(body(&result)["message"], "Lead created");

        let message = rx.recv().await.unwrap();
        assert_eq!(message.resource, "lead");
        assert_eq!(message.record["email"], "lee@example.com");
    }

    #[tokio::test]
    async fn rejected_lead_sends_nothing() {
        let (notifier, mut rx) = WorkflowNotifier::channel();
        let handler = CrudHandler::<Lead>::new(Arc::new(InMemoryRowStore::new())).with_notifier(notifier);
        let result = handler.handle(&post(json!({ "email": "bad" }))).await.unwrap();
        assert_eq!(result.status_code, 400);
        assert_eq!(
            body(&result),
            json!({ "error": ["Name is required", "Valid email required"] })
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn opportunity_patch_flow() {
        let handler = CrudHandler::<Opportunity>::new(Arc::new(InMemoryRowStore::new()));
        let patch = |b: Value| InvocationEvent::new(HttpMethod::Patch, "/fn").with_body(b.to_string());

        let one = body(
            &handler
                .handle(&post(json!({ "title": "Deal One", "value": 50000, "stage": "new" })))
                .await
                .unwrap(),
        );
        let id = one["opportunity"]["id"].clone();
        assert_eq!(one["opportunity"]["value"], json!(50000));
        handler
            .handle(&post(json!({ "title": "Deal Two", "value": 10000 })))
            .await
            .unwrap();

        let result = handler.handle(&patch(json!({ "id": id, "stage": "review" }))).await.unwrap();
        assert_eq!(result.status_code, 200);
        let updated = body(&result);
        assert_eq!(updated["message"], "Opportunity updated");
        assert_eq!(updated["opportunity"]["stage"], "review");
        assert_eq!(updated["opportunity"]["title"], "Deal One");

        let result = handler.handle(&patch(json!({ "id": id, "title": "Deal Two" }))).await.unwrap();
        assert_eq!(result.status_code, 409);
        assert_eq!(body(&result), json!({ "error": "Duplicate opportunity title" }));

        let result = handler.handle(&patch(json!({ "stage": "bogus" }))).await.unwrap();
        assert_eq!(result.status_code, 400);
        assert_eq!(body(&result), json!({ "error": ["Id is required", "Invalid stage"] }));

        let result = handler
            .handle(&patch(json!({ "id": "00000000-0000-0000-0000-000000000000", "stage": "lost" })))
            .await
            .unwrap();
        assert_eq!(result.status_code, 404);
        assert_eq!(body(&result), json!({ "error": "Opportunity not found" }));
    }
}
