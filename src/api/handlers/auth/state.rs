//! Shared auth components wired once at startup.

use std::sync::Arc;

use crate::session::{
    AuthConfig, AuthGuard, CredentialAuthenticator, GoogleProvider, IdentityProvider, OAuthBridge,
    OAuthConfig, RefreshCoordinator, SessionStore, TokenCodec,
};

/// Everything the auth handlers need, built from one immutable configuration.
pub struct AuthState {
    config: Arc<AuthConfig>,
    store: Arc<dyn SessionStore>,
    guard: AuthGuard,
    refresh: RefreshCoordinator,
    credentials: CredentialAuthenticator,
    oauth: OAuthBridge,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        oauth_config: OAuthConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let config = Arc::new(config);
        let codec = Arc::new(TokenCodec::new(&config));

        Self {
            guard: AuthGuard::new(Arc::clone(&codec)),
            refresh: RefreshCoordinator::new(
                Arc::clone(&codec),
                Arc::clone(&store),
                config.rotation(),
            ),
            credentials: CredentialAuthenticator::new(Arc::clone(&codec), Arc::clone(&store)),
            oauth: OAuthBridge::new(
                Arc::new(oauth_config),
                provider,
                Arc::clone(&codec),
                Arc::clone(&store),
            ),
            config,
            store,
        }
    }

    /// Same as [`AuthState::new`] with the Google provider.
    ///
    /// # Errors
    /// Fails if the provider's HTTP client cannot be built.
    pub fn with_google(
        config: AuthConfig,
        oauth_config: OAuthConfig,
        store: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let provider = GoogleProvider::new(Arc::new(oauth_config.clone()))?;
        Ok(Self::new(config, oauth_config, Arc::new(provider), store))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn guard(&self) -> &AuthGuard {
        &self.guard
    }

    pub fn refresh(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn credentials(&self) -> &CredentialAuthenticator {
        &self.credentials
    }

    pub fn oauth(&self) -> &OAuthBridge {
        &self.oauth
    }
}
