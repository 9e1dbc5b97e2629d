//! Endpoints behind the authorization gate.

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::UserProfile;
use crate::AppState;

/// GET /me
pub async fn get_me(AuthUser(ctx): AuthUser) -> Json<UserProfile> {
    Json(ctx.user.sanitized())
}

/// POST /logout
///
/// Revokes the session the request authenticated with.
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<StatusCode, AppError> {
    state.sessions.invalidate(&ctx.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
