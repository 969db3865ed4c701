//! Cookie-based API client with silent session refresh.

mod retry;

pub use retry::{Attempt, ClientError, HttpRefresher, RetryingClient, SessionRefresher};

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Public profile returned by `GET /auth/me`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Talks to the parkgate API, keeping session cookies in its own jar.
pub struct ApiClient {
    http: Client,
    api_base: String,
    retrying: RetryingClient<HttpRefresher>,
}

impl ApiClient {
    /// `api_base` is the versioned API root, e.g. `https://parkgate.dev/api/v1`.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(api_base: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .cookie_store(true)
            .build()?;
        let api_base = api_base.trim_end_matches('/').to_string();
        let retrying = RetryingClient::new(HttpRefresher::new(http.clone(), &api_base));
        Ok(Self {
            http,
            api_base,
            retrying,
        })
    }

    /// Sign in with a password; the session cookies land in the client's jar.
    ///
    /// # Errors
    /// [`ClientError::Unauthorized`] on bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.api_base))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        check(response)?;
        Ok(())
    }

    /// Fetch the signed-in user's profile, refreshing the session once if needed.
    ///
    /// # Errors
    /// [`ClientError::Unauthorized`] when the replay is denied too, or
    /// [`ClientError::RefreshFailed`] when the session cannot be renewed.
    pub async fn me(&self) -> Result<Profile, ClientError> {
        let url = format!("{}/auth/me", self.api_base);
        let (http, url) = (&self.http, url.as_str());
        self.retrying
            .execute(move |_| async move {
                let response = http.get(url).send().await?;
                Ok(check(response)?.json::<Profile>().await?)
            })
            .await
    }

    /// End the session. The server clears cookies even when revocation fails.
    ///
    /// # Errors
    /// Transport failures only.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.api_base))
            .send()
            .await?;
        check(response)?;
        Ok(())
    }
}

fn check(response: Response) -> Result<Response, ClientError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        status if status.is_success() => Ok(response),
        status => Err(ClientError::Status(status)),
    }
}
