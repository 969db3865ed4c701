//! Refresh and logout endpoints.
//!
//! Both read the refresh token from its path-scoped cookie. A failed refresh
//! clears both cookies so the browser never keeps a half-valid pair; logout
//! clears them no matter what happened server-side.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    cookies::{REFRESH_COOKIE_NAME, clear_session_cookies, read_cookie, session_cookies},
    state::AuthState,
    types::AccessTokenResponse,
};
use crate::session::LogoutOutcome;

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "New access token issued, cookies set", body = AccessTokenResponse),
        (status = 401, description = "Unauthorized, cookies cleared", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let presented = read_cookie(&headers, REFRESH_COOKIE_NAME);
    match auth_state.refresh().refresh(presented.as_deref()).await {
        Ok(outcome) => {
            let rotated_refresh = outcome
                .rotated
                .then_some(outcome.refresh_token.as_str());
            let cookies = session_cookies(
                auth_state.config(),
                &outcome.access_token,
                rotated_refresh,
            );
            let body = AccessTokenResponse {
                access_token: outcome.access_token.clone(),
            };
            (StatusCode::OK, cookies, Json(body)).into_response()
        }
        Err(err) => {
            let cookies = clear_session_cookies(auth_state.config());
            (cookies, err).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let presented = read_cookie(&headers, REFRESH_COOKIE_NAME);
    let outcome = auth_state.credentials().logout(presented.as_deref()).await;
    if outcome != LogoutOutcome::Revoked {
        debug!("Logout finished without server-side revocation: {outcome:?}");
    }

    // Always clear the cookies, even if revocation failed.
    (
        StatusCode::NO_CONTENT,
        clear_session_cookies(auth_state.config()),
    )
        .into_response()
}
