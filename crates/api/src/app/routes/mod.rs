use axum::{Router, routing::get};

pub mod batches;
pub mod requisitions;
pub mod system;

/// Router for all endpoints that need an identity.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/requisitions", requisitions::router())
        .nest("/batches", batches::router())
}
