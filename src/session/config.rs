//! Immutable configuration for the session core.
//!
//! Built once at startup from CLI/env input and shared read-only (behind an
//! `Arc`) by every component. Invalid values are rejected here so a running
//! server never discovers missing configuration per request.

use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr, time::Duration};
use url::Url;

const DEFAULT_API_URL: &str = "/api/v1";
const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;
/// Ten years; longer lifetimes are rejected at startup.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;
const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo?alt=json";

/// Deployment environment; only `production` turns on `Secure` cookies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

/// Whether a successful refresh also replaces the refresh token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshRotation {
    #[default]
    Rotate,
    Reuse,
}

impl FromStr for RefreshRotation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "rotate" => Ok(Self::Rotate),
            "reuse" => Ok(Self::Reuse),
            other => Err(format!("unknown refresh rotation: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    rotation: RefreshRotation,
    api_url: String,
    environment: Environment,
}

impl AuthConfig {
    /// Validate and build the token configuration.
    ///
    /// # Errors
    /// Returns an error if the secret is empty, a lifetime is negative or above
    /// [`MAX_TOKEN_TTL_SECONDS`], or the refresh lifetime does not exceed the
    /// access lifetime.
    pub fn new(
        signing_secret: SecretString,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Result<Self> {
        if signing_secret.expose_secret().trim().is_empty() {
            bail!("signing secret must not be empty");
        }
        if access_ttl_seconds < 0 || refresh_ttl_seconds < 0 {
            bail!("token lifetimes must not be negative");
        }
        if access_ttl_seconds > MAX_TOKEN_TTL_SECONDS || refresh_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            bail!("token lifetimes must not exceed {MAX_TOKEN_TTL_SECONDS}s");
        }
        if refresh_ttl_seconds <= access_ttl_seconds {
            bail!(
                "refresh token lifetime ({refresh_ttl_seconds}s) must exceed access token lifetime ({access_ttl_seconds}s)"
            );
        }

        Ok(Self {
            signing_secret,
            access_ttl_seconds,
            refresh_ttl_seconds,
            rotation: RefreshRotation::default(),
            api_url: DEFAULT_API_URL.to_string(),
            environment: Environment::default(),
        })
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: RefreshRotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub(crate) fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn rotation(&self) -> RefreshRotation {
        self.rotation
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Cookies are only marked `Secure` in production.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Path the refresh cookie is scoped to.
    ///
    /// The API URL may be a full URL or a bare path; only the path part is used.
    #[must_use]
    pub fn refresh_cookie_path(&self) -> String {
        let base = Url::parse(&self.api_url)
            .map_or_else(|_| self.api_url.clone(), |url| url.path().to_string());
        let base = base.trim_end_matches('/');
        if base.starts_with('/') || base.is_empty() {
            format!("{base}/auth/refresh")
        } else {
            format!("/{base}/auth/refresh")
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"***")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("rotation", &self.rotation)
            .field("api_url", &self.api_url)
            .field("environment", &self.environment)
            .finish()
    }
}

#[derive(Clone)]
pub struct OAuthConfig {
    client_id: String,
    client_secret: SecretString,
    callback_url: String,
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
    timeout: Duration,
}

impl OAuthConfig {
    /// Build the Google OAuth client configuration.
    ///
    /// # Errors
    /// Returns an error if any of the client values is empty or the callback is
    /// not an absolute URL.
    pub fn new(client_id: String, client_secret: SecretString, callback_url: String) -> Result<Self> {
        if client_id.trim().is_empty() {
            bail!("OAuth client id must not be empty");
        }
        if client_secret.expose_secret().trim().is_empty() {
            bail!("OAuth client secret must not be empty");
        }
        if Url::parse(&callback_url).is_err() {
            bail!("OAuth callback URL must be an absolute URL: {callback_url}");
        }

        Ok(Self {
            client_id,
            client_secret,
            callback_url,
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECONDS),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_authorize_url(mut self, url: String) -> Self {
        self.authorize_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: String) -> Self {
        self.userinfo_url = url;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    #[must_use]
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("callback_url", &self.callback_url)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
