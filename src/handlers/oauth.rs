//! Redirect and callback endpoints for federated login.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::AppError;
use crate::oauth::STATE_COOKIE;
use crate::AppState;

/// Best-effort client address from proxy headers. Falls back to "unknown"
/// when the service is hit directly without a proxy in front.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).map(|v| v == "1" || v == "true").unwrap_or(false)
}

/// GET /oauth/:provider
///
/// Sets the transient state cookie and redirects to the identity provider.
pub async fn start_oauth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let mobile = flag(&params, "ismobile");
    let popup = flag(&params, "popup");

    let outcome = state.oauth.start(&provider, mobile, popup).await?;

    let cookie = Cookie::build((STATE_COOKIE, outcome.artifact))
        .path("/oauth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(state.signer.ttl_minutes()))
        .build();

    Ok((jar.add(cookie), Redirect::to(&outcome.redirect_url)).into_response())
}

/// GET /oauth/:provider/callback
///
/// Completes the flow and delivers the session token through the channel
/// chosen at flow start.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let artifact = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let query_state = params.get("state").cloned().unwrap_or_default();
    let code = params.get("code").cloned().unwrap_or_default();

    let remote_ip = client_ip(&headers);
    let agent = user_agent(&headers);

    let outcome = state
        .oauth
        .complete(
            &provider,
            artifact.as_deref(),
            &query_state,
            &code,
            remote_ip,
            agent,
        )
        .await?;

    // The artifact is single-use.
    let jar = jar.remove(Cookie::build((STATE_COOKIE, "")).path("/oauth").build());

    let response = if outcome.mobile {
        let location = format!(
            "{}://?token={}",
            state.config.auth.mobile_scheme,
            urlencoding::encode(&outcome.token)
        );
        Redirect::to(&location).into_response()
    } else if outcome.popup {
        Html(popup_page(&outcome.token, &state.config.auth.frontend_url)).into_response()
    } else {
        let location = format!(
            "{}?token={}",
            state.config.auth.frontend_url,
            urlencoding::encode(&outcome.token)
        );
        Redirect::to(&location).into_response()
    };

    let mut response = (jar, response).into_response();
    disable_caching(response.headers_mut());
    Ok(response)
}

/// Token responses must never be cached by proxies or the browser.
fn disable_caching(headers: &mut HeaderMap) {
    headers.insert(
        header::EXPIRES,
        HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, private, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-expires", HeaderValue::from_static("0"));
}

/// Minimal page for the popup flow: hand the token to the opener and close.
fn popup_page(token: &str, frontend_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Signing in...</title></head>
<body>
<script>
  if (window.opener) {{
    window.opener.postMessage({{ token: "{token}" }}, "{origin}");
    window.close();
  }} else {{
    window.location = "{origin}?token={token}";
  }}
</script>
</body>
</html>
"#,
        token = token,
        origin = frontend_url,
    )
}
