//! authkit: session-based authentication over federated and local identities.

pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::auth_middleware;
use crate::oauth::{OauthFlow, ProviderRegistry, StateSigner};
use crate::services::{AuthService, SessionService};
use crate::store::AuthStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn AuthStore>,
    pub registry: Arc<ProviderRegistry>,
    pub signer: Arc<StateSigner>,
    pub auth: AuthService,
    pub sessions: SessionService,
    pub oauth: OauthFlow,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn AuthStore>) -> Result<Self, AppError> {
        let signer = Arc::new(StateSigner::new(
            &config.auth.state_secret,
            config.auth.state_ttl_minutes,
        ));
        let registry = Arc::new(ProviderRegistry::new());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.auth.idp_timeout_seconds))
            .build()
            .map_err(|e| AppError::Config(anyhow::anyhow!("http client: {}", e)))?;

        let auth = AuthService::new(store.clone());
        let sessions = SessionService::new(store.clone());
        let oauth = OauthFlow::new(
            registry.clone(),
            signer.clone(),
            http,
            store.clone(),
            auth.clone(),
            sessions.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            registry,
            signer,
            auth,
            sessions,
            oauth,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let protected = Router::new()
        .route("/me", get(handlers::user::get_me))
        .route("/logout", post(handlers::user::logout))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/oauth/:provider", get(handlers::oauth::start_oauth))
        .route(
            "/oauth/:provider/callback",
            get(handlers::oauth::oauth_callback),
        )
        .route("/basic/signup", post(handlers::basic::signup))
        .route("/basic/login", post(handlers::basic::login))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.ping().await?;
    Ok(Json(json!({
        "status": "healthy",
        "service": state.config.service_name,
    })))
}
