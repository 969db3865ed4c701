//! HTTP mapping for [`AuthError`], applied once at the transport boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::session::AuthError;

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Every authentication failure looks the same to the caller.
        if self.is_authentication_failure() {
            debug!("Authentication failed: {self}");
            return (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE).into_response();
        }

        match self {
            Self::EmailAlreadyInUse => (StatusCode::CONFLICT, self.to_string()).into_response(),
            Self::EmailNotVerified => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            Self::InvalidInput(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::ExternalProviderError(detail) => {
                warn!("Identity provider failure: {detail}");
                (StatusCode::BAD_GATEWAY, "Identity provider error").into_response()
            }
            other => {
                error!("Auth request failed: {other:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
