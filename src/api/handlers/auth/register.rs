use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::{
    state::AuthState,
    types::{RegisterRequest, UserResponse},
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "Email already in use", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse {
    match auth_state
        .credentials()
        .register(&request.email, &request.password, &request.name)
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(UserResponse::from(user))).into_response(),
        Err(err) => err.into_response(),
    }
}
