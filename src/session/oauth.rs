//! Google sign-in: consent redirect, code exchange and identity reconciliation.
//!
//! Flow Overview:
//! 1. `build_consent_url` sends the browser to Google's consent screen.
//! 2. Google redirects back with a one-time `code`.
//! 3. `complete` exchanges the code, fetches the profile and reconciles it to a
//!    local user, then starts a session exactly like a password login.
//!
//! Provider calls are never retried and are bounded by the configured timeout.
//! Any provider problem surfaces as [`AuthError::ExternalProviderError`] with
//! nothing committed locally.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{Instrument, debug, info, info_span, instrument, warn};
use url::Url;

use super::{
    config::OAuthConfig,
    error::AuthError,
    issue::start_session,
    store::{NewUser, SessionStore, StoreError, User},
    token::{TokenCodec, TokenPair},
    utils::normalize_email,
};

const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Token endpoint response. Only the access token is used.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Userinfo endpoint response.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Outbound calls to an OAuth identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError>;
}

/// Google's token and userinfo endpoints over reqwest.
pub struct GoogleProvider {
    config: Arc<OAuthConfig>,
    client: Client,
}

impl GoogleProvider {
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: Arc<OAuthConfig>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, client })
    }
}

fn provider_error(context: &str, err: impl std::fmt::Display) -> AuthError {
    warn!("{context}: {err}");
    AuthError::ExternalProviderError(format!("{context}: {err}"))
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
        let url = self.config.token_url();
        let payload = json!({
            "code": code,
            "client_id": self.config.client_id(),
            "client_secret": self.config.client_secret().expose_secret(),
            "redirect_uri": self.config.callback_url(),
            "grant_type": "authorization_code",
        });

        let span = info_span!("oauth.google.exchange_code", http.method = "POST", url = %url);
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .instrument(span)
            .await
            .map_err(|err| provider_error("token request failed", err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(
                "token endpoint rejected the code",
                format!("{status} - {body}"),
            ));
        }

        response
            .json::<ProviderTokens>()
            .await
            .map_err(|err| provider_error("invalid token response", err))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError> {
        let url = self.config.userinfo_url();
        let span = info_span!("oauth.google.userinfo", http.method = "GET", url = %url);
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .instrument(span)
            .await
            .map_err(|err| provider_error("userinfo request failed", err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(provider_error("userinfo endpoint failed", status));
        }

        response
            .json::<ProviderProfile>()
            .await
            .map_err(|err| provider_error("invalid userinfo response", err))
    }
}

pub struct OAuthBridge {
    config: Arc<OAuthConfig>,
    provider: Arc<dyn IdentityProvider>,
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
}

impl OAuthBridge {
    #[must_use]
    pub fn new(
        config: Arc<OAuthConfig>,
        provider: Arc<dyn IdentityProvider>,
        codec: Arc<TokenCodec>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            provider,
            codec,
            store,
        }
    }

    /// Google consent screen URL for this client.
    ///
    /// # Errors
    /// [`AuthError::Internal`] if the configured authorize URL is not a URL.
    pub fn build_consent_url(&self) -> Result<String, AuthError> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            self.config.authorize_url(),
            [
                ("redirect_uri", self.config.callback_url()),
                ("client_id", self.config.client_id()),
                ("access_type", "offline"),
                ("response_type", "code"),
                ("prompt", "consent"),
                ("scope", scope.as_str()),
            ],
        )
        .map_err(|err| anyhow::anyhow!("invalid authorize url: {err}"))?;
        Ok(url.into())
    }

    /// # Errors
    /// [`AuthError::ExternalProviderError`] on provider failure or timeout.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
        bounded(self.config.timeout(), self.provider.exchange_code(code)).await
    }

    /// # Errors
    /// [`AuthError::ExternalProviderError`] on provider failure or timeout.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError> {
        bounded(self.config.timeout(), self.provider.fetch_profile(access_token)).await
    }

    /// Map a provider profile to a local user and start a session for it.
    ///
    /// # Errors
    /// [`AuthError::EmailNotVerified`] before any lookup when the provider
    /// has not verified the email.
    #[instrument(skip_all, fields(google_id = %profile.id))]
    pub async fn reconcile_identity(
        &self,
        profile: ProviderProfile,
    ) -> Result<TokenPair, AuthError> {
        if !profile.verified_email {
            return Err(AuthError::EmailNotVerified);
        }

        let email = normalize_email(&profile.email);
        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => self.create_from_profile(email, profile).await?,
        };

        start_session(&self.codec, self.store.as_ref(), &user).await
    }

    async fn create_from_profile(
        &self,
        email: String,
        profile: ProviderProfile,
    ) -> Result<User, AuthError> {
        let name = profile
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.clone());

        let created = self
            .store
            .create(NewUser {
                email: email.clone(),
                name,
                password_hash: None,
                google_id: Some(profile.id),
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = %user.id, "user created from google profile");
                Ok(user)
            }
            // Someone registered the same email between lookup and insert.
            Err(StoreError::Conflict) => {
                debug!("concurrent creation for google profile, reloading");
                self.store
                    .find_by_email(&email)
                    .await?
                    .ok_or(AuthError::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Exchange → profile → reconcile.
    ///
    /// # Errors
    /// Provider failures, [`AuthError::EmailNotVerified`] or store failures.
    #[instrument(skip_all)]
    pub async fn complete(&self, code: &str) -> Result<TokenPair, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidInput("missing authorization code".to_string()));
        }
        let tokens = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&tokens.access_token).await?;
        self.reconcile_identity(profile).await
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    tokio::time::timeout(limit, call).await.map_err(|_| {
        warn!(timeout_ms = limit.as_millis(), "identity provider timed out");
        AuthError::ExternalProviderError("identity provider timed out".to_string())
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{config::AuthConfig, store::MemorySessionStore, token::TokenKind};
    use anyhow::Result;
    use secrecy::SecretString;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    fn oauth_config(server_uri: &str) -> Result<OAuthConfig> {
        Ok(OAuthConfig::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            "https://parkgate.dev/api/v1/auth/google/callback".to_string(),
        )?
        .with_token_url(format!("{server_uri}/token"))
        .with_userinfo_url(format!("{server_uri}/userinfo"))
        .with_timeout(Duration::from_millis(500)))
    }

    struct StubProvider {
        profile: ProviderProfile,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
            Ok(ProviderTokens {
                access_token: format!("provider-{code}"),
                id_token: None,
                expires_in: None,
            })
        }

        async fn fetch_profile(&self, _: &str) -> Result<ProviderProfile, AuthError> {
            Ok(self.profile.clone())
        }
    }

    fn profile(email: &str, verified: bool) -> ProviderProfile {
        ProviderProfile {
            id: "google-123".to_string(),
            email: email.to_string(),
            verified_email: verified,
            name: Some("Google Driver".to_string()),
        }
    }

    fn bridge(profile: ProviderProfile) -> Result<(OAuthBridge, Arc<MemorySessionStore>, Arc<TokenCodec>)> {
        let auth = AuthConfig::new(SecretString::from("secret".to_string()), 60, 3600)?;
        let codec = Arc::new(TokenCodec::new(&auth));
        let store = Arc::new(MemorySessionStore::new());
        let bridge = OAuthBridge::new(
            Arc::new(oauth_config("http://127.0.0.1:9")?),
            Arc::new(StubProvider { profile }),
            Arc::clone(&codec),
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        Ok((bridge, store, codec))
    }

    #[test]
    fn consent_url_carries_required_parameters() -> Result<()> {
        let (bridge, _, _) = bridge(profile("a@example.com", true))?;
        let url = Url::parse(&bridge.build_consent_url()?)?;
        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(params.get("access_type").map(String::as_str), Some("offline"));
        assert_eq!(params.get("prompt").map(String::as_str), Some("consent"));
        assert_eq!(params.get("client_id").map(String::as_str), Some("client-id"));
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("https://parkgate.dev/api/v1/auth/google/callback")
        );
        assert_eq!(params.get("scope"), Some(&SCOPES.join(" ")));

        assert_eq!(bridge.build_consent_url()?, bridge.build_consent_url()?);
        Ok(())
    }

    #[tokio::test]
    async fn unverified_email_is_rejected_before_any_user_exists() -> Result<()> {
        let (bridge, store, _) = bridge(profile("new@example.com", false))?;
        assert!(matches!(
            bridge.complete("code").await,
            Err(AuthError::EmailNotVerified)
        ));
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn verified_new_email_creates_one_passwordless_user() -> Result<()> {
        let (bridge, store, codec) = bridge(profile("New@Example.com", true))?;
        let pair = bridge.complete("code").await?;

        assert_eq!(store.len().await, 1);
        let user = store
            .find_by_email("new@example.com")
            .await?
            .ok_or_else(|| anyhow::anyhow!("user missing"))?;
        assert!(user.password_hash.is_none());
        assert_eq!(user.google_id.as_deref(), Some("google-123"));
        assert_eq!(user.name, "Google Driver");
        assert_eq!(
            user.active_refresh_token.as_deref(),
            Some(pair.refresh_token.as_str())
        );
        assert_eq!(
            codec.verify_kind(&pair.access_token, TokenKind::Access)?.sub,
            user.id
        );

        // A second sign-in reuses the same account.
        bridge.complete("code").await?;
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn existing_password_account_keeps_its_hash() -> Result<()> {
        let (bridge, store, _) = bridge(profile("driver@example.com", true))?;
        let existing = store
            .create(NewUser {
                email: "driver@example.com".to_string(),
                name: "Driver".to_string(),
                password_hash: Some("$argon2id$stored".to_string()),
                google_id: None,
            })
            .await?;

        let pair = bridge.complete("code").await?;
        let user = store.find_by_id(existing.id).await?;
        assert_eq!(user.password_hash.as_deref(), Some("$argon2id$stored"));
        assert_eq!(
            user.active_refresh_token.as_deref(),
            Some(pair.refresh_token.as_str())
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_name_falls_back_to_email() -> Result<()> {
        let mut nameless = profile("anon@example.com", true);
        nameless.name = None;
        let (bridge, store, _) = bridge(nameless)?;
        bridge.complete("code").await?;
        let user = store
            .find_by_email("anon@example.com")
            .await?
            .ok_or_else(|| anyhow::anyhow!("user missing"))?;
        assert_eq!(user.name, "anon@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn google_provider_exchanges_code_and_fetches_profile() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_partial_json(json!({
                "code": "auth-code",
                "client_id": "client-id",
                "client_secret": "client-secret",
                "grant_type": "authorization_code",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "google-access",
                "id_token": "google-id-token",
                "expires_in": 3599,
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer google-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "google-123",
                "email": "driver@example.com",
                "verified_email": true,
                "name": "Driver",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(Arc::new(oauth_config(&server.uri())?))?;
        let tokens = provider.exchange_code("auth-code").await?;
        assert_eq!(tokens.access_token, "google-access");
        let profile = provider.fetch_profile(&tokens.access_token).await?;
        assert_eq!(profile.email, "driver@example.com");
        assert!(profile.verified_email);
        Ok(())
    }

    #[tokio::test]
    async fn google_provider_maps_rejections_to_provider_errors() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(Arc::new(oauth_config(&server.uri())?))?;
        assert!(matches!(
            provider.exchange_code("bad").await,
            Err(AuthError::ExternalProviderError(_))
        ));
        assert!(matches!(
            provider.fetch_profile("bad").await,
            Err(AuthError::ExternalProviderError(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn slow_provider_times_out_without_creating_users() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = Arc::new(oauth_config(&server.uri())?);
        let auth = AuthConfig::new(SecretString::from("secret".to_string()), 60, 3600)?;
        let store = Arc::new(MemorySessionStore::new());
        let bridge = OAuthBridge::new(
            Arc::clone(&config),
            Arc::new(GoogleProvider::new(config)?),
            Arc::new(TokenCodec::new(&auth)),
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );

        assert!(matches!(
            bridge.complete("auth-code").await,
            Err(AuthError::ExternalProviderError(_))
        ));
        assert!(store.is_empty().await);
        Ok(())
    }
}
