use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use parkgate::{
    api::{self, AuthState},
    session::{
        AuthConfig, AuthError, IdentityProvider, MemorySessionStore, OAuthConfig,
        ProviderProfile, ProviderTokens,
    },
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct StubProvider {
    verified: bool,
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn exchange_code(&self, _code: &str) -> Result<ProviderTokens, AuthError> {
        Ok(ProviderTokens {
            access_token: "google-access".to_string(),
            id_token: None,
            expires_in: Some(3599),
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<ProviderProfile, AuthError> {
        Ok(ProviderProfile {
            id: "google-123".to_string(),
            email: "driver@gmail.com".to_string(),
            verified_email: self.verified,
            name: Some("Driver".to_string()),
        })
    }
}

fn app(verified: bool) -> Result<Router> {
    let config = AuthConfig::new(SecretString::from("integration-secret".to_string()), 900, 3600)?;
    let oauth = OAuthConfig::new(
        "client-id".to_string(),
        SecretString::from("client-secret".to_string()),
        "http://localhost:8080/api/v1/auth/google/callback".to_string(),
    )?;
    let state = AuthState::new(
        config,
        oauth,
        Arc::new(StubProvider { verified }),
        Arc::new(MemorySessionStore::new()),
    );
    Ok(api::app(Arc::new(state), None))
}

fn json_request(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn post_with_cookie(uri: &str, cookie: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())?)
}

/// `name=value` for the named cookie among the response's `Set-Cookie` headers.
fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

fn cookie_attributes(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

async fn body_json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn register_and_login(app: &Router) -> Result<Response> {
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/v1/auth/register",
            &json!({"email": "Ana@Example.com", "password": "hunter22", "name": "Ana"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/v1/auth/login",
            &json!({"email": "ana@example.com", "password": "hunter22"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(response)
}

#[tokio::test]
async fn register_rejects_duplicate_email() -> Result<()> {
    let app = app(true)?;
    register_and_login(&app).await?;

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/v1/auth/register",
            &json!({"email": "ana@example.com", "password": "another1", "name": "Ana B"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn login_sets_scoped_http_only_cookies() -> Result<()> {
    let app = app(true)?;
    let response = register_and_login(&app).await?;

    let access = cookie_attributes(&response, "access_token").context("access cookie")?;
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Strict"));
    assert!(access.contains("Path=/;") || access.contains("Path=/ "));

    let refresh = cookie_attributes(&response, "refresh_token").context("refresh cookie")?;
    assert!(refresh.contains("Path=/api/v1/auth/refresh"));
    assert!(!refresh.contains("Secure"));

    let body = body_json(response).await?;
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    Ok(())
}

#[tokio::test]
async fn me_requires_a_valid_access_token() -> Result<()> {
    let app = app(true)?;
    let login = register_and_login(&app).await?;
    let access = set_cookie(&login, "access_token").context("access cookie")?;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(COOKIE, access)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/v1/auth/me").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(COOKIE, "access_token=not-a-jwt")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_and_rejects_the_previous_token() -> Result<()> {
    let app = app(true)?;
    let login = register_and_login(&app).await?;
    let first = set_cookie(&login, "refresh_token").context("refresh cookie")?;

    let response = app
        .clone()
        .oneshot(post_with_cookie("/api/v1/auth/refresh", &first)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let second = set_cookie(&response, "refresh_token").context("rotated refresh cookie")?;
    assert_ne!(first, second);
    assert!(set_cookie(&response, "access_token").is_some());
    assert!(body_json(response).await?["access_token"].is_string());

    // The superseded token no longer matches the stored pointer.
    let response = app
        .clone()
        .oneshot(post_with_cookie("/api/v1/auth/refresh", &first)?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cleared = cookie_attributes(&response, "refresh_token").context("cleared cookie")?;
    assert!(cleared.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() -> Result<()> {
    let app = app(true)?;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes_the_session() -> Result<()> {
    let app = app(true)?;
    let login = register_and_login(&app).await?;
    let refresh = set_cookie(&login, "refresh_token").context("refresh cookie")?;

    let response = app
        .clone()
        .oneshot(post_with_cookie("/api/v1/auth/logout", &refresh)?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = cookie_attributes(&response, "access_token").context("cleared cookie")?;
    assert!(cleared.contains("Max-Age=0"));

    let response = app
        .clone()
        .oneshot(post_with_cookie("/api/v1/auth/refresh", &refresh)?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logging out without a session still succeeds.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/logout")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn google_consent_redirects_to_provider() -> Result<()> {
    let app = app(true)?;
    let response = app
        .oneshot(Request::builder().uri("/api/v1/auth/google").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .context("location header")?;
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("client_id=client-id"));
    assert!(location.contains("prompt=consent"));
    Ok(())
}

#[tokio::test]
async fn google_callback_starts_a_session_for_verified_email() -> Result<()> {
    let app = app(true)?;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/google/callback?code=abc")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "refresh_token").is_some());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/google/callback")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn google_callback_rejects_unverified_email() -> Result<()> {
    let app = app(false)?;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/google/callback?code=abc")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookie(&response, "access_token").is_none());
    Ok(())
}

#[tokio::test]
async fn health_reports_store_and_request_id() -> Result<()> {
    let app = app(true)?;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await?;
    assert_eq!(body["name"], "parkgate");
    Ok(())
}
