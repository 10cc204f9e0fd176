//! One-way workflow notifications.
//!
//! A handler enqueues a [`WorkflowMessage`] and moves on. A background
//! worker delivers it to the workflow endpoint; delivery is at-most-once and
//! a failure only reaches the log.

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// A created record announced to the workflow endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowMessage {
    /// Singular resource name, used as the payload key.
    pub resource: String,
    pub record: Value,
}

impl WorkflowMessage {
    /// Wire payload, e.g. `{"lead": {...}}`.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.resource.clone(), self.record.clone());
        Value::Object(body)
    }
}

/// Sending half of the notification channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkflowNotifier {
    tx: mpsc::UnboundedSender<WorkflowMessage>,
}

impl WorkflowNotifier {
    /// A notifier plus the receiving end, for callers that run their own
    /// consumer (tests, alternative transports).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Spawn the HTTP delivery worker and return its notifier.
    ///
    /// Each message is posted in its own task so a slow endpoint never
    /// holds up later notifications. Once every notifier is dropped the
    /// worker finishes the deliveries in flight and exits.
    pub fn spawn_http(client: reqwest::Client, url: String) -> (Self, JoinHandle<()>) {
        let (notifier, mut rx) = Self::channel();
        let worker = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            while let Some(message) = rx.recv().await {
                while in_flight.try_join_next().is_some() {}
                let client = client.clone();
                let url = url.clone();
                in_flight.spawn(async move {
                    match deliver(&client, &url, &message).await {
                        Ok(status) => {
                            tracing::debug!(resource = %message.resource, %status, "workflow notified");
                        }
                        Err(err) => {
                            tracing::warn!(resource = %message.resource, url = %url, error = %err, "workflow notification failed");
                        }
                    }
                });
            }
            while in_flight.join_next().await.is_some() {}
            tracing::debug!("workflow notifier closed");
        });
        (notifier, worker)
    }

    /// Enqueue a notification. Never blocks and never fails the caller.
    pub fn notify(&self, resource: &str, record: Value) {
        let message = WorkflowMessage {
            resource: resource.to_string(),
            record,
        };
        if self.tx.send(message).is_err() {
            tracing::warn!(resource, "workflow worker is gone; notification dropped");
        }
    }
}

async fn deliver(
    client: &reqwest::Client,
    url: &str,
    message: &WorkflowMessage,
) -> anyhow::Result<reqwest::StatusCode> {
    let response = client.post(url).json(&message.payload()).send().await?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("workflow endpoint answered {status}");
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn messages_arrive_in_order() {
        let (notifier, mut rx) = WorkflowNotifier::channel();
        notifier.notify("lead", json!({ "email": "a@example.com" }));
        notifier.notify("lead", json!({ "email": "b@example.com" }));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.payload(), json!({ "lead": { "email": "a@example.com" } }));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.record["email"], "b@example.com");
    }

    #[tokio::test]
    async fn closed_channel_is_swallowed() {
        let (notifier, rx) = WorkflowNotifier::channel();
        drop(rx);
        notifier.notify("lead", json!({}));
    }
}
