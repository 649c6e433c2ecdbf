use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;
use tracing::debug;

use shared_models::error::AppError;

/// Session token exactly as the caller sent it in `Authorization`.
///
/// The clinic backend issues and validates tokens itself; this service only
/// forwards them, so no scheme is stripped or added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn read_token(headers: &HeaderMap) -> Result<AuthToken, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?
        .trim();

    if auth_value.is_empty() {
        return Err(AppError::Auth("Empty authorization header".to_string()));
    }

    Ok(AuthToken(auth_value.to_string()))
}

// Rejects unauthenticated requests before they reach a handler and stashes the
// token for the extractor below.
pub async fn auth_middleware(mut request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let token = read_token(request.headers())?;
    debug!("Authorization header present for {}", request.uri().path());

    request.extensions_mut().insert(token);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthToken>() {
            Some(token) => Ok(token.clone()),
            None => read_token(&parts.headers),
        }
    }
}
