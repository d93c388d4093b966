use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use crate::app::dto;
use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<ActorContext>) -> impl IntoResponse {
    Json(dto::WhoAmIResponse {
        user_id: ctx.actor().user_id().to_string(),
        role: ctx.actor().role().as_str().to_string(),
    })
}
