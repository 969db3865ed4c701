//! Postgres-backed [`SessionStore`].

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::{NewUser, SessionStore, StoreError, User};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, google_id, role, active_refresh_token";

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "SELECT 1 FROM users WHERE id = $1";
        let span = db_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to check user existence")?;
        Ok(row.is_some())
    }
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        google_id: row.get("google_id"),
        role: row.get("role"),
        active_refresh_token: row.get("active_refresh_token"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let span = db_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = db_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(user_from_row).ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO users (email, name, password_hash, google_id) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let span = db_span("INSERT", &query);
        let result = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(&user.google_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert user"),
            )),
        }
    }

    async fn update_session_pointer(
        &self,
        id: Uuid,
        expected_prior: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<(), StoreError> {
        // The comparison happens inside the UPDATE so Postgres row locking
        // decides the winner of concurrent writers.
        let query = r"
            UPDATE users
            SET active_refresh_token = $3,
                updated_at = NOW()
            WHERE id = $1
              AND active_refresh_token IS NOT DISTINCT FROM $2
        ";
        let span = db_span("UPDATE", query);
        let result = sqlx::query(query)
            .bind(id)
            .bind(expected_prior)
            .bind(new_value)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update session pointer")?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        if self.user_exists(id).await? {
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn set_session_pointer(
        &self,
        id: Uuid,
        new_value: Option<&str>,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE users
            SET active_refresh_token = $2,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = db_span("UPDATE", query);
        let result = sqlx::query(query)
            .bind(id)
            .bind(new_value)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to set session pointer")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let query = "SELECT 1";
        let span = db_span("SELECT", query);
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}
