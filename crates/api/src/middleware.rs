use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use supplygate_auth::{Actor, Role};
use supplygate_core::UserId;

use crate::app::errors;
use crate::context::ActorContext;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Build the request's [`ActorContext`] from the identity headers set by the
/// authenticating gateway.
pub async fn identity_middleware(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let actor = match extract_actor(req.headers()) {
        Ok(actor) => actor,
        Err(reason) => {
            tracing::debug!(reason, "request rejected without identity");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", reason);
        }
    };

    req.extensions_mut().insert(ActorContext::new(actor));
    next.run(req).await
}

fn extract_actor(headers: &HeaderMap) -> Result<Actor, &'static str> {
    let user_id: UserId = header(headers, USER_ID_HEADER)?
        .parse()
        .map_err(|_| "x-user-id is not a valid id")?;
    let role: Role = header(headers, USER_ROLE_HEADER)?
        .parse()
        .map_err(|_| "x-user-role is not a known role")?;
    Ok(Actor::new(user_id, role))
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, &'static str> {
    let value = headers
        .get(name)
        .ok_or("missing identity headers")?
        .to_str()
        .map_err(|_| "identity headers must be ASCII")?
        .trim();
    if value.is_empty() {
        return Err("missing identity headers");
    }
    Ok(value)
}
