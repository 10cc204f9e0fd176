use serde_json::Value;
use thiserror::Error;

use dealflow_core::DomainError;
use dealflow_store::StoreError;

use crate::InvocationResult;

/// Outcome taxonomy for function handlers.
///
/// Every variant except [`FunctionError::Fault`] is an expected outcome that
/// becomes an ordinary response. A fault is propagated to the dispatcher.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl From<DomainError> for FunctionError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(messages) => Self::Validation(messages),
            DomainError::InvalidId(msg) => Self::Validation(vec![msg]),
            DomainError::NotFound(msg) => Self::NotFound(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<StoreError> for FunctionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl FunctionError {
    pub fn status(&self) -> u16 {
        match self {
            FunctionError::InvalidJson | FunctionError::Validation(_) => 400,
            FunctionError::NotFound(_) => 404,
            FunctionError::MethodNotAllowed => 405,
            FunctionError::Conflict(_) => 409,
            FunctionError::Store(_) | FunctionError::Fault(_) => 500,
        }
    }

    /// Client-facing response. Validation failures list every message.
    pub fn into_result(self) -> InvocationResult {
        let status = self.status();
        match self {
            FunctionError::Validation(messages) => InvocationResult::error(
                status,
                Value::Array(messages.into_iter().map(Value::String).collect()),
            ),
            other => InvocationResult::error(status, other.to_string()),
        }
    }
}

/// Fold a handler outcome into a response, letting faults through.
pub(crate) fn settle(outcome: Result<InvocationResult, FunctionError>) -> anyhow::Result<InvocationResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(FunctionError::Fault(err)) => Err(err),
        Err(err) => {
            if let FunctionError::Store(store) = &err {
                tracing::error!(error = %store, "store failure");
            }
            Ok(err.into_result())
        }
    }
}
