//! Refresh token exchange with reuse detection.
//!
//! Flow Overview:
//! 1. Reject an absent token.
//! 2. Verify signature/expiry and require `kind == refresh`.
//! 3. Load the subject; unknown users are treated as an invalid token.
//! 4. Conditionally swap the stored pointer from the presented token to its
//!    successor. A lost swap means the token was superseded (or a concurrent
//!    refresh won), reported as [`AuthError::TokenMismatch`].
//! 5. Issue a new access token.
//!
//! Every error ends the session from the caller's point of view: the HTTP layer
//! clears both credentials on any failure returned here.

use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    config::RefreshRotation,
    error::AuthError,
    store::{SessionStore, StoreError},
    token::{TokenCodec, TokenKind},
};

/// Result of a successful refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub user_id: Uuid,
    pub access_token: String,
    /// The refresh token now stored as the session pointer.
    pub refresh_token: String,
    pub rotated: bool,
}

pub struct RefreshCoordinator {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
    rotation: RefreshRotation,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn SessionStore>,
        rotation: RefreshRotation,
    ) -> Self {
        Self {
            codec,
            store,
            rotation,
        }
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    /// [`AuthError::MissingToken`], the codec's verification errors,
    /// [`AuthError::InvalidToken`] for a wrong kind or unknown subject,
    /// [`AuthError::TokenMismatch`] when the token is no longer the live one,
    /// or [`AuthError::Internal`] on persistence failure.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: Option<&str>) -> Result<RefreshOutcome, AuthError> {
        let presented = presented
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.codec.verify_kind(presented, TokenKind::Refresh)?;

        let user = match self.store.find_by_id(claims.sub).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                debug!(user_id = %claims.sub, "refresh token subject no longer exists");
                return Err(AuthError::InvalidToken);
            }
            Err(err) => return Err(err.into()),
        };

        let (next_refresh, rotated) = match self.rotation {
            RefreshRotation::Rotate => (
                self.codec
                    .issue(user.id, &user.email, TokenKind::Refresh)?,
                true,
            ),
            RefreshRotation::Reuse => (presented.to_string(), false),
        };

        match self
            .store
            .update_session_pointer(user.id, Some(presented), Some(&next_refresh))
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                warn!(user_id = %user.id, "refresh token does not match the active session");
                return Err(AuthError::TokenMismatch);
            }
            Err(StoreError::NotFound) => return Err(AuthError::InvalidToken),
            Err(err) => return Err(err.into()),
        }

        let access_token = self.codec.issue(user.id, &user.email, TokenKind::Access)?;
        debug!(user_id = %user.id, rotated, "session refreshed");

        Ok(RefreshOutcome {
            user_id: user.id,
            access_token,
            refresh_token: next_refresh,
            rotated,
        })
    }
}
