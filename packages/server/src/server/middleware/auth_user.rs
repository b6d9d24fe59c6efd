use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::common::UserId;
use crate::server::error::ApiError;

/// Header carrying the caller's user id, set by the upstream identity layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// Reads the caller header and adds `AuthUser` to request extensions.
/// A missing or malformed header leaves the request anonymous.
pub async fn identify_caller(mut request: Request, next: Next) -> Response {
    match extract_auth_user(&request) {
        Some(user) => {
            debug!("Caller: {}", user.user_id);
            request.extensions_mut().insert(user);
        }
        None => debug!("Anonymous request"),
    }

    next.run(request).await
}

fn extract_auth_user(request: &Request) -> Option<AuthUser> {
    let header = request.headers().get(USER_ID_HEADER)?;
    let user_id = header.to_str().ok()?.trim().parse::<UserId>().ok()?;
    Some(AuthUser { user_id })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Missing or invalid x-user-id header"))
    }
}
