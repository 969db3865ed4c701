//! Persistence contract for users and their single session pointer.
//!
//! The session core only ever needs five operations. The interesting one is
//! [`SessionStore::update_session_pointer`], a conditional write: it succeeds
//! only when the stored `active_refresh_token` still equals the expected prior
//! value. Of two racing updates expecting the same prior, at most one wins.

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "user";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub role: String,
    pub active_refresh_token: Option<String>,
}

/// Fields accepted when creating a user. New users never have a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("conditional update lost: stored value changed")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    /// Insert a new user; a duplicate email fails with [`StoreError::Conflict`].
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Replace the session pointer only if it still equals `expected_prior`.
    async fn update_session_pointer(
        &self,
        id: Uuid,
        expected_prior: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Overwrite the session pointer regardless of its current value.
    async fn set_session_pointer(&self, id: Uuid, new_value: Option<&str>)
    -> Result<(), StoreError>;

    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
