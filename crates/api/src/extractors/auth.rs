use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use realtydesk_services::support::Caller;

use crate::{error::ApiError, state::AppState};

/// Caller resolved from a JWT (Authorization header or cookie). Rejects
/// requests without a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

/// Like `AuthUser`, but a request without any token is let through as an
/// unauthenticated caller. A token that is present must still be valid.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Caller);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = request_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        Ok(AuthUser(app_state.auth.resolve_caller(&token)?))
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match request_token(parts) {
            Some(token) => Ok(MaybeAuthUser(app_state.auth.resolve_caller(&token)?)),
            None => Ok(MaybeAuthUser(Caller::anonymous())),
        }
    }
}

fn request_token(parts: &Parts) -> Option<String> {
    // Try Authorization header first
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        // Then try cookie
        .or_else(|| {
            parts
                .headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        cookie
                            .trim()
                            .strip_prefix("access_token=")
                            .map(|s| s.to_string())
                    })
                })
        })
        .filter(|t| !t.is_empty())
}

/// Helper trait for extracting AppState from composite state types
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl FromRef<AppState> for AppState {
    fn from_ref(input: &AppState) -> Self {
        input.clone()
    }
}
