//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the catalog and stream endpoints
//! - Static hosting for the web player
//! - CORS, tracing and timeout middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
