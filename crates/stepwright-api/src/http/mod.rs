//! HTTP/REST API layer for Stepwright.
//!
//! Axum-based REST API at `/api/v1/` with anti-forgery protection on every
//! mutating route and a `{success, ...}` envelope response format.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
