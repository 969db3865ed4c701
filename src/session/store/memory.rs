//! In-process store used by tests and the `--in-memory` development mode.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DEFAULT_ROLE, NewUser, SessionStore, StoreError, User};

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let users = self.users.lock().await;
        users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict);
        }

        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            google_id: user.google_id,
            role: DEFAULT_ROLE.to_string(),
            active_refresh_token: None,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_session_pointer(
        &self,
        id: Uuid,
        expected_prior: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<(), StoreError> {
        // Compare and swap under one lock acquisition.
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if user.active_refresh_token.as_deref() != expected_prior {
            return Err(StoreError::Conflict);
        }
        user.active_refresh_token = new_value.map(str::to_string);
        Ok(())
    }

    async fn set_session_pointer(
        &self,
        id: Uuid,
        new_value: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.active_refresh_token = new_value.map(str::to_string);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
