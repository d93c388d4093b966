//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: engine, store and sink wiring
//! - `routes/`: HTTP routes + handlers (one file per aggregate)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    // Protected routes: require an identity context.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn(middleware::identity_middleware)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
