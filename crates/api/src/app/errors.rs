use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use supplygate_core::{DomainError, ErrorKind};
use supplygate_infra::WorkflowError;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        tracing::error!(error = %err, "workflow action failed");
        return json_error(status_for(kind), kind.as_str(), "internal error");
    }
    json_error(status_for(kind), kind.as_str(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id, answering 400 on garbage.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e: DomainError| json_error(StatusCode::BAD_REQUEST, e.kind().as_str(), e.to_string()))
}
