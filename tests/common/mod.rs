//! Shared harness for the HTTP integration tests. Everything runs against an
//! in-memory store; federated providers are pointed at a stub server.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use authkit::config::{AppConfig, AuthFlowConfig, DatabaseConfig, Environment};
use authkit::models::{Provider, ProviderCode};
use authkit::oauth::{Endpoints, ProviderRegistry};
use authkit::store::{AuthStore, MemoryStore};
use authkit::{build_router, AppState};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        ProviderRegistry::seed_defaults(store.as_ref())
            .await
            .unwrap();

        let config = AppConfig {
            port: 8080,
            environment: Environment::Dev,
            service_name: "authkit-test".to_string(),
            log_level: "warn".to_string(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 1,
            },
            auth: AuthFlowConfig {
                state_secret: "integration-test-secret-0123456789".to_string(),
                state_ttl_minutes: 5,
                idp_timeout_seconds: 5,
                frontend_url: "http://frontend.test".to_string(),
                mobile_scheme: "authkit".to_string(),
            },
            allowed_origins: vec!["http://frontend.test".to_string()],
        };

        let state = AppState::new(config, store.clone()).unwrap();
        Self { state, store }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn enable_basic(&self) {
        let mut row = Provider::seed(ProviderCode::Basic);
        row.enabled = true;
        self.store.upsert_provider(&row).await.unwrap();
    }

    /// Enable a federated provider and point its endpoints at a stub server.
    pub async fn enable_provider(&self, code: ProviderCode, stub_url: &str) {
        let mut row = Provider::seed(code);
        row.client_id = "test-client-id".to_string();
        row.client_secret = "test-client-secret".to_string();
        row.callback_url = format!("http://localhost/oauth/{}/callback", code.as_str());
        row.enabled = true;
        self.store.upsert_provider(&row).await.unwrap();

        self.state
            .registry
            .override_endpoints(
                code.as_str(),
                Endpoints {
                    auth_url: format!("{}/authorize", stub_url),
                    token_url: format!("{}/token", stub_url),
                    userinfo_url: format!("{}/user", stub_url),
                    scopes: "email",
                },
            )
            .await;
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn get_with_auth(&self, path: &str, token: &str) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn post_with_auth(&self, path: &str, token: &str) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Convenience: signup + login, returning a live session token.
    pub async fn signup_and_login(&self, name: &str, email: &str, password: &str) -> String {
        let res = self
            .post_json(
                "/basic/signup",
                serde_json::json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = self
            .post_json(
                "/basic/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let body = read_json(res).await;
        body["token"].as_str().unwrap().to_string()
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Value of a named cookie from a `Set-Cookie` response header.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| {
            let (pair, _) = raw.split_once(';').unwrap_or((raw, ""));
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name && !value.is_empty()).then(|| value.to_string())
        })
}

/// Query parameter from a URL string.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name {
            Some(urlencoding::decode(value).ok()?.into_owned())
        } else {
            None
        }
    })
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
