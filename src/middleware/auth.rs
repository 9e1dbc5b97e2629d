//! Bearer-token authorization gate.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::AuthContext;
use crate::AppState;

/// Pull the bearer token out of the `Authorization` header. A raw token
/// without the `Bearer ` prefix is accepted as well.
fn extract_token(parts_headers: &axum::http::HeaderMap) -> Option<&str> {
    let raw = parts_headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolve the bearer token and stash the [`AuthContext`] in request
/// extensions. Requests without a valid live session are rejected here and
/// never reach the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let ctx = state.sessions.resolve(token).await?;
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

/// Extractor for handlers behind [`auth_middleware`].
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn token_extraction_accepts_bearer_and_raw() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, "abc123".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_header_yields_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_token(&headers), None);
    }
}
