use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;

use crate::{AppState, error::AuthError, models::jwt::Identity};

/// Identity resolved by the gate, available to gated handlers.
#[derive(Debug, Clone, Copy)]
pub struct CurrentIdentity(pub Identity);

/// The raw bearer token of the request.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(request.headers())
        .ok_or(AuthError::Unauthorized)?
        .to_owned();

    let identity = state.sessions.authenticate(&token).await?;

    request.extensions_mut().insert(CurrentIdentity(identity));

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_bearer_token(&parts.headers)
            .map(|token| BearerToken(token.to_string()))
            .ok_or(AuthError::Unauthorized)
    }
}

/// `Authorization: Bearer <token>`, exactly two parts. Anything else counts as
/// no token at all.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;

    let mut parts = value.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?;

    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}
