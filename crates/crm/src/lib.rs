//! CRM domain module (leads, investors, opportunities) plus deal analysis.
//!
//! This crate contains the record schemas and business rules, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod deal;
pub mod investor;
pub mod lead;
pub mod opportunity;
pub mod resource;

pub use deal::{DealAnalysis, DealInput, RiskCategory, analyze, normalize_deal_input};
pub use investor::Investor;
pub use lead::Lead;
pub use opportunity::{Opportunity, Stage};
pub use resource::{CREATED_FIELD, ID_FIELD, Resource, Row};
