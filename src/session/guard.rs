//! Access token verification for protected operations.
//!
//! The guard returns a [`Principal`] or an [`AuthError`]; there is no boolean
//! form, so "unauthenticated" can never be read as "continue anonymously".

use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::AuthError,
    token::{TokenCodec, TokenKind},
};

/// Authenticated caller derived from a verified access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct AuthGuard {
    codec: Arc<TokenCodec>,
}

impl AuthGuard {
    #[must_use]
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Verify the access credential presented by the transport.
    ///
    /// # Errors
    /// [`AuthError::MissingToken`] when nothing (or only whitespace) was
    /// presented, otherwise the codec's verification error. Refresh tokens are
    /// rejected as [`AuthError::InvalidToken`].
    pub fn verify(&self, access_token: Option<&str>) -> Result<Principal, AuthError> {
        let token = access_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.codec.verify_kind(token, TokenKind::Access)?;

        Ok(Principal {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
