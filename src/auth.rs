//! Bearer token authentication.
//!
//! Auth is optional: with an empty allow-list every request passes.

use crate::types::ErrorResponse;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    Missing,
    #[error("Invalid authentication credentials")]
    Invalid,
}

/// Check an `Authorization` header value against the allow-list.
pub fn verify_token(allowed: &[String], authorization: Option<&str>) -> Result<(), AuthError> {
    if allowed.is_empty() {
        return Ok(());
    }
    let token = authorization
        .and_then(|h| h.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Missing)?;
    if allowed.iter().any(|k| k == token) {
        Ok(())
    } else {
        Err(AuthError::Invalid)
    }
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match verify_token(&state.api_keys, authorization) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!("{} for {}", e, request.uri().path());
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
