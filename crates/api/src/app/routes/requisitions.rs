use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use supplygate_core::RequisitionId;
use supplygate_infra::NewBatch;

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id/submit", post(submit))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
        .route("/:id/process", post(process))
        .route("/:id/comments", post(comment))
        .route("/:id/approved-quantities", put(set_approved_quantities))
        .route("/:id/timeline", get(timeline))
        .route("/:id/capabilities", get(capabilities))
        .route("/:id/batches", get(list_batches).post(create_batch))
}

fn requisition_id(raw: &str) -> Result<RequisitionId, axum::response::Response> {
    errors::parse_id(raw)
}

async fn submit(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().submit(id, ctx.actor()) {
        Ok(requisition) => (StatusCode::OK, Json(requisition)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn approve(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Option<Json<dto::ApproveRequest>>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let Json(payload) = payload.unwrap_or_default();

    match services.engine().approve(id, ctx.actor(), payload.comment) {
        Ok(requisition) => (StatusCode::OK, Json(requisition)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn reject(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<dto::RejectRequest>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().reject(id, ctx.actor(), &payload.comment) {
        Ok(requisition) => (StatusCode::OK, Json(requisition)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn process(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<dto::ProcessRequest>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().process(id, ctx.actor(), payload.target_status) {
        Ok(requisition) => (StatusCode::OK, Json(requisition)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn comment(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<dto::CommentRequest>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().comment(id, ctx.actor(), &payload.text) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn set_approved_quantities(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<dto::ApprovedQuantitiesRequest>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let quantities: Vec<_> = payload
        .items
        .into_iter()
        .map(|line| (line.item_id, line.quantity))
        .collect();

    match services.engine().set_approved_quantities(id, ctx.actor(), &quantities) {
        Ok(requisition) => (StatusCode::OK, Json(requisition)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn timeline(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().timeline(id, ctx.actor()) {
        Ok(trail) => (StatusCode::OK, Json(trail)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn capabilities(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().capabilities(id, ctx.actor()) {
        Ok(caps) => (StatusCode::OK, Json(caps)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn list_batches(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().batches(id, ctx.actor()) {
        Ok(batches) => (StatusCode::OK, Json(batches)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn create_batch(
    Extension(ctx): Extension<ActorContext>,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(payload): Json<NewBatch>,
) -> axum::response::Response {
    let id = match requisition_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.engine().create_batch(id, ctx.actor(), payload) {
        Ok(batch) => (StatusCode::CREATED, Json(batch)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
