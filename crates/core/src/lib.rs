//! `dealflow-core`: shared primitives for the CRM functions.
//!
//! This crate is **pure** (no IO): identifiers, the domain error model, the
//! field validation catalogue, and webhook signature verification.

pub mod error;
pub mod id;
pub mod signature;
pub mod time;
pub mod validation;

pub use error::{DomainError, DomainResult};
pub use id::RecordId;
pub use signature::{SignatureError, SignedRequest};
pub use validation::Validator;

/// A stored record: a flat JSON object keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;
