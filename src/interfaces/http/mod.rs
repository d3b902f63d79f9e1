//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, validated JSON extractor
//! - `middleware`: bearer-token middleware and `Authenticated` extractor
//! - `modules`: auth, health and metrics endpoints
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use common::ApiResponse;
pub use router::{create_api_router, ApiDoc, RouterDeps};
