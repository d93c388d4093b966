use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};

use supplygate_core::BatchId;
use supplygate_shipments::BatchPatch;

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id", patch(update_batch))
        .route("/:id/advance", post(advance_batch))
        .route("/:id/pickup", post(schedule_pickup))
        .route("/:id/capabilities", get(capabilities))
}

fn batch_id(raw: &str) -> Result<BatchId, axum::response::Response> {
    errors::parse_id(raw)
}

async fn update_batch(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<BatchPatch>,
) -> axum::response::Response {
    let id = match batch_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().update_batch(id, ctx.actor(), payload) {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn advance_batch(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<dto::AdvanceBatchRequest>,
) -> axum::response::Response {
    let id = match batch_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().advance_batch(id, ctx.actor(), payload.action) {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn schedule_pickup(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<dto::SchedulePickupRequest>,
) -> axum::response::Response {
    let id = match batch_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services
        .engine()
        .schedule_pickup(id, ctx.actor(), payload.estimated_date, &payload.note)
    {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn capabilities(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match batch_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().batch_capabilities(id, ctx.actor()) {
        Ok(caps) => (StatusCode::OK, Json(caps)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
