use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::{principal::Principal, state::AuthState, types::UserResponse};
use crate::session::{AuthError, StoreError};

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Return the authenticated user profile", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = String)
    ),
    tag = "auth"
)]
pub async fn me(
    auth_state: Extension<Arc<AuthState>>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    match auth_state.store().find_by_id(principal.user_id).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        // The token outlived its user.
        Err(StoreError::NotFound) => AuthError::InvalidToken.into_response(),
        Err(err) => AuthError::from(err).into_response(),
    }
}
