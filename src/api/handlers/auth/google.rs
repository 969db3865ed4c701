//! Google sign-in endpoints.

use axum::{
    Json,
    extract::{Extension, Query},
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, warn};

use super::{
    cookies::session_cookies,
    state::AuthState,
    types::{GoogleCallbackQuery, TokenPairResponse},
};
use crate::session::AuthError;

#[utoipa::path(
    get,
    path = "/api/v1/auth/google",
    responses(
        (status = 302, description = "Redirect to the Google consent screen")
    ),
    tag = "auth"
)]
pub async fn google_consent(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let url = match auth_state.oauth().build_consent_url() {
        Ok(url) => url,
        Err(err) => return err.into_response(),
    };
    match HeaderValue::from_str(&url) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(err) => {
            error!("Failed to build consent redirect: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/google/callback",
    params(GoogleCallbackQuery),
    responses(
        (status = 200, description = "Session started, cookies set", body = TokenPairResponse),
        (status = 400, description = "Missing authorization code", body = String),
        (status = 403, description = "Email not verified by Google", body = String),
        (status = 502, description = "Identity provider error", body = String)
    ),
    tag = "auth"
)]
pub async fn google_callback(
    auth_state: Extension<Arc<AuthState>>,
    Query(query): Query<GoogleCallbackQuery>,
) -> impl IntoResponse {
    if let Some(reason) = query.error {
        warn!("Google consent denied: {reason}");
        return AuthError::ExternalProviderError(reason).into_response();
    }
    let Some(code) = query.code else {
        return AuthError::InvalidInput("missing authorization code".to_string()).into_response();
    };

    match auth_state.oauth().complete(&code).await {
        Ok(pair) => {
            let headers = session_cookies(
                auth_state.config(),
                &pair.access_token,
                Some(&pair.refresh_token),
            );
            (StatusCode::OK, headers, Json(TokenPairResponse::from(pair))).into_response()
        }
        Err(err) => err.into_response(),
    }
}
