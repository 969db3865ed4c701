//! Single silent refresh on `401`, then one replay.
//!
//! The wrapped call receives an [`Attempt`] so the replay is distinguishable
//! from the first request. The replay's result is returned as is: a second
//! `401` surfaces to the caller instead of triggering another refresh, so one
//! `execute` makes at most two calls and one refresh.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use thiserror::Error;
use tracing::{Instrument, debug, info_span, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    Original,
    Replay,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("session refresh failed: {0}")]
    RefreshFailed(String),
    #[error("unexpected status: {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Something that can renew the session credentials held by the client.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self) -> Result<(), ClientError>;
}

pub struct RetryingClient<R> {
    refresher: R,
}

impl<R: SessionRefresher> RetryingClient<R> {
    pub fn new(refresher: R) -> Self {
        Self { refresher }
    }

    /// Run `call`, refreshing once and replaying once if it is unauthorized.
    ///
    /// # Errors
    /// The first error when it is not [`ClientError::Unauthorized`],
    /// [`ClientError::RefreshFailed`] when the refresh fails (no replay), or
    /// whatever the replay returns.
    pub async fn execute<T, F, Fut>(&self, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        match call(Attempt::Original).await {
            Err(ClientError::Unauthorized) => {}
            other => return other,
        }

        debug!("request unauthorized, refreshing session");
        self.refresher.refresh().await.map_err(|err| match err {
            ClientError::RefreshFailed(_) => err,
            other => ClientError::RefreshFailed(other.to_string()),
        })?;

        call(Attempt::Replay).await
    }
}

/// Refreshes by POSTing to the refresh endpoint with the shared cookie jar.
pub struct HttpRefresher {
    http: Client,
    refresh_url: String,
}

impl HttpRefresher {
    #[must_use]
    pub fn new(http: Client, api_base: &str) -> Self {
        Self {
            http,
            refresh_url: format!("{}/auth/refresh", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SessionRefresher for HttpRefresher {
    async fn refresh(&self) -> Result<(), ClientError> {
        let span = info_span!("client.refresh", http.method = "POST", url = %self.refresh_url);
        let response = self
            .http
            .post(&self.refresh_url)
            .send()
            .instrument(span)
            .await
            .map_err(|err| ClientError::RefreshFailed(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!(%status, "session refresh rejected");
            Err(ClientError::RefreshFailed(status.to_string()))
        }
    }
}
