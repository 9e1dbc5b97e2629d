//! Local-credential endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use validator::Validate;

use crate::dtos::{LoginRequest, SignupRequest, SignupResponse, TokenResponse};
use crate::error::AppError;
use crate::handlers::oauth::{client_ip, user_agent};
use crate::utils::Password;
use crate::AppState;

/// POST /basic/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    payload.validate()?;

    let user = state
        .auth
        .signup_basic(
            payload.name,
            payload.email,
            &Password::new(payload.password),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.user_id,
            message: "account created".to_string(),
        }),
    ))
}

/// POST /basic/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate().map_err(|_| AppError::InvalidCredentials)?;

    let user = state
        .auth
        .verify_basic(&payload.email, &Password::new(payload.password))
        .await?;

    let token = state
        .sessions
        .create(&user, client_ip(&headers), user_agent(&headers))
        .await?;

    Ok(Json(TokenResponse { token }))
}
