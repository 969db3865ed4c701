use thiserror::Error;

use super::store::StoreError;

/// Failure taxonomy shared by every session component.
///
/// Authentication failures carry distinct variants for logging and tests, but
/// the HTTP layer collapses them into one uniform `401` (see
/// [`AuthError::is_authentication_failure`]).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("malformed token")]
    MalformedToken,
    #[error("refresh token does not match the active session")]
    TokenMismatch,
    #[error("email provided is not verified")]
    EmailNotVerified,
    #[error("identity provider error: {0}")]
    ExternalProviderError(String),
    #[error("not found")]
    NotFound,
    #[error("conflicting update")]
    Conflict,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// True for the failures that must look identical to the caller.
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::MissingToken
                | Self::InvalidToken
                | Self::ExpiredToken
                | Self::MalformedToken
                | Self::TokenMismatch
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict => Self::Conflict,
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}
