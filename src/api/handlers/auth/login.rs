use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::{
    cookies::session_cookies,
    state::AuthState,
    types::{LoginRequest, TokenPairResponse},
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session started, cookies set", body = TokenPairResponse),
        (status = 401, description = "Unauthorized", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    match auth_state
        .credentials()
        .login(&request.email, &request.password)
        .await
    {
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
