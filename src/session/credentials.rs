//! Email/password registration, login and logout.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    error::AuthError,
    issue::start_session,
    store::{NewUser, SessionStore, StoreError, User},
    token::{TokenCodec, TokenKind, TokenPair},
    utils::{MIN_PASSWORD_LEN, hash_password, normalize_email, valid_email, verify_password},
};

/// What logout managed to do server-side. Cookies are cleared regardless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutOutcome {
    Revoked,
    NoSession,
    Failed,
}

pub struct CredentialAuthenticator {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
}

impl CredentialAuthenticator {
    #[must_use]
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn SessionStore>) -> Self {
        Self { codec, store }
    }

    /// Create a password account. The new user has no session.
    ///
    /// # Errors
    /// [`AuthError::InvalidInput`] for a bad email, short password or blank
    /// name, [`AuthError::EmailAlreadyInUse`] for a taken email.
    #[instrument(skip(self, password, name))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidInput("email must be valid".to_string()));
        }
        let password = password.trim();
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("name is required".to_string()));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let password_hash = hash_password(password)?;
        let user = match self
            .store
            .create(NewUser {
                email,
                name: name.to_string(),
                password_hash: Some(password_hash),
                google_id: None,
            })
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email.
            Err(StoreError::Conflict) => return Err(AuthError::EmailAlreadyInUse),
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check a password and start a fresh session, superseding any prior one.
    /// The password is trimmed, as at registration.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for an unknown email, an OAuth-only
    /// account or a wrong password, all indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_by_email(&email).await? else {
            debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let matches = user
            .password_hash
            .as_deref()
            .is_some_and(|stored| verify_password(password.trim(), stored));
        if !matches {
            debug!(user_id = %user.id, "login with wrong password or no password set");
            return Err(AuthError::InvalidCredentials);
        }

        start_session(&self.codec, self.store.as_ref(), &user).await
    }

    /// Best-effort revocation of the presented refresh token.
    ///
    /// Never fails: problems are logged and reported through the outcome.
    #[instrument(skip_all)]
    pub async fn logout(&self, presented: Option<&str>) -> LogoutOutcome {
        let Some(presented) = presented.map(str::trim).filter(|token| !token.is_empty()) else {
            return LogoutOutcome::NoSession;
        };

        let claims = match self.codec.verify_kind(presented, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(err) => {
                warn!("logout with unusable refresh token: {err}");
                return LogoutOutcome::Failed;
            }
        };

        let user = match self.store.find_by_id(claims.sub).await {
            Ok(user) => user,
            Err(err) => {
                warn!(user_id = %claims.sub, "logout lookup failed: {err}");
                return LogoutOutcome::Failed;
            }
        };

        match self
            .store
            .update_session_pointer(user.id, Some(presented), None)
            .await
        {
            Ok(()) => {
                info!(user_id = %user.id, "session revoked");
                LogoutOutcome::Revoked
            }
            Err(err) => {
                warn!(user_id = %user.id, "failed to revoke session: {err}");
                LogoutOutcome::Failed
            }
        }
    }
}
