//! Access/refresh token signing and verification.
//!
//! Tokens are HS256 JWTs. Every token carries an explicit `kind` claim so an
//! access token can never be replayed where a refresh token is expected, and a
//! fresh `jti` so two tokens issued in the same second still differ.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};
use ulid::Ulid;
use uuid::Uuid;

use super::{config::AuthConfig, error::AuthError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Token pair handed out by login and OAuth reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.signing_secret().expose_secret().as_bytes();

        // Expiry is checked by `verify_at` with zero leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl_seconds: config.access_ttl_seconds(),
            refresh_ttl_seconds: config.refresh_ttl_seconds(),
        }
    }

    fn ttl_seconds(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_seconds,
        }
    }

    /// Sign a token of the given kind for `subject`.
    ///
    /// # Errors
    /// Returns [`AuthError::Internal`] if signing fails.
    pub fn issue(&self, subject: Uuid, email: &str, kind: TokenKind) -> Result<String, AuthError> {
        self.issue_at(subject, email, kind, unix_now())
    }

    /// Sign a token using an explicit clock value.
    ///
    /// # Errors
    /// Returns [`AuthError::Internal`] if the expiry overflows or signing fails.
    pub fn issue_at(
        &self,
        subject: Uuid,
        email: &str,
        kind: TokenKind,
        now_unix_seconds: i64,
    ) -> Result<String, AuthError> {
        let exp = now_unix_seconds
            .checked_add(self.ttl_seconds(kind))
            .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("token expiry overflows")))?;
        let claims = Claims {
            sub: subject,
            email: email.to_string(),
            kind,
            iat: now_unix_seconds,
            exp,
            jti: Ulid::new().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Internal(anyhow::anyhow!("failed to sign token: {err}")))
    }

    /// Issue an access and a refresh token from the same clock reading.
    ///
    /// # Errors
    /// Returns [`AuthError::Internal`] if signing fails.
    pub fn issue_pair(&self, subject: Uuid, email: &str) -> Result<TokenPair, AuthError> {
        let now = unix_now();
        Ok(TokenPair {
            access_token: self.issue_at(subject, email, TokenKind::Access, now)?,
            refresh_token: self.issue_at(subject, email, TokenKind::Refresh, now)?,
        })
    }

    /// Verify signature and expiry and return the decoded claims.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`], [`AuthError::ExpiredToken`] or
    /// [`AuthError::MalformedToken`].
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, unix_now())
    }

    /// Verify against an explicit clock value.
    ///
    /// # Errors
    /// Same as [`TokenCodec::verify`].
    pub fn verify_at(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedToken,
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            },
        )?;

        if data.claims.exp <= now_unix_seconds {
            return Err(AuthError::ExpiredToken);
        }

        Ok(data.claims)
    }

    /// Verify and require the given `kind`; a mismatch is an invalid token.
    ///
    /// # Errors
    /// Same as [`TokenCodec::verify`], plus [`AuthError::InvalidToken`] on a
    /// kind mismatch.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish_non_exhaustive()
    }
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
