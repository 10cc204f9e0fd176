//! Row store: the persistence collaborator behind the CRUD functions.
//!
//! Handlers only see the [`RowStore`] trait (select / insert / update /
//! delete with equality filters). The in-memory store backs dev and tests;
//! the Postgres store is available behind the `postgres` feature.

pub mod error;
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod row_store;

pub use dealflow_core::Row;
pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryRowStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRowStore;
pub use query::{Filter, Order, Query};
pub use row_store::RowStore;
