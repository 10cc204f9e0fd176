//! HTTP front end: configuration, middleware and the function dispatcher.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
