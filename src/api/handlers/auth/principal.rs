//! Access guard for protected routes.
//!
//! Attached with `route_layer(middleware::from_fn(require_access))`. On success
//! the verified [`Principal`] is inserted into the request extensions; on
//! failure the request never reaches the handler.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{cookies::extract_access_token, state::AuthState};

pub use crate::session::Principal;

pub async fn require_access(
    auth_state: Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_access_token(request.headers());
    match auth_state.guard().verify(token.as_deref()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}
