//! Session and token lifecycle.
//!
//! Components, leaves first:
//! - [`TokenCodec`] signs and verifies access/refresh tokens.
//! - [`SessionStore`] holds each user's single live refresh token.
//! - [`AuthGuard`] admits requests carrying a valid access token.
//! - [`RefreshCoordinator`] trades a live refresh token for a new access token.
//! - [`CredentialAuthenticator`] handles password registration, login and logout.
//! - [`OAuthBridge`] turns a Google sign-in into the same kind of session.

pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
mod issue;
pub mod oauth;
pub mod refresh;
pub mod store;
pub mod token;
mod utils;

pub use config::{AuthConfig, Environment, MAX_TOKEN_TTL_SECONDS, OAuthConfig, RefreshRotation};
pub use credentials::{CredentialAuthenticator, LogoutOutcome};
pub use error::AuthError;
pub use guard::{AuthGuard, Principal};
pub use oauth::{GoogleProvider, IdentityProvider, OAuthBridge, ProviderProfile, ProviderTokens};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use store::{MemorySessionStore, NewUser, PgSessionStore, SessionStore, StoreError, User};
pub use token::{Claims, TokenCodec, TokenKind, TokenPair};
