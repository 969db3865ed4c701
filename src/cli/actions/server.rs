use crate::{
    api::{self, StoreBackend},
    cli::{
        commands::{auth, oauth},
        telemetry,
    },
    session::{AuthConfig, OAuthConfig},
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend: StoreBackend,
    pub auth: auth::Options,
    pub oauth: oauth::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let frontend_base_url = args.auth.frontend_base_url.clone();
    let (auth_config, oauth_config) = build_configs(args.auth, args.oauth)?;

    info!(
        environment = %auth_config.environment(),
        rotation = ?auth_config.rotation(),
        "starting parkgate"
    );

    let result = api::new(
        args.port,
        args.backend,
        auth_config,
        oauth_config,
        &frontend_base_url,
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

fn build_configs(auth: auth::Options, oauth: oauth::Options) -> Result<(AuthConfig, OAuthConfig)> {
    let auth_config = AuthConfig::new(
        auth.jwt_secret,
        auth.access_ttl_seconds,
        auth.refresh_ttl_seconds,
    )
    .context("invalid token configuration")?
    .with_rotation(auth.rotation)
    .with_api_url(auth.api_url)
    .with_environment(auth.environment);

    let oauth_config = OAuthConfig::new(oauth.client_id, oauth.client_secret, oauth.callback_url)
        .context("invalid Google sign-in configuration")?
        .with_timeout(Duration::from_secs(oauth.timeout_seconds));

    Ok((auth_config, oauth_config))
}

fn log_startup_args(args: &Args) {
    let backend = match &args.backend {
        StoreBackend::Postgres { .. } => "postgres",
        StoreBackend::InMemory => "memory",
    };
    debug!(
        port = args.port,
        backend,
        access_ttl_seconds = args.auth.access_ttl_seconds,
        refresh_ttl_seconds = args.auth.refresh_ttl_seconds,
        api_url = %args.auth.api_url,
        frontend_base_url = %args.auth.frontend_base_url,
        callback_url = %args.oauth.callback_url,
        "server args"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Environment, RefreshRotation};
    use secrecy::SecretString;

    fn auth_options(access: i64, refresh: i64) -> auth::Options {
        auth::Options {
            access_ttl_seconds: access,
            refresh_ttl_seconds: refresh,
            jwt_secret: SecretString::from("s3cret".to_string()),
            api_url: "https://parkgate.dev/api/v1".to_string(),
            environment: Environment::Production,
            rotation: RefreshRotation::Reuse,
            frontend_base_url: "https://app.parkgate.dev".to_string(),
        }
    }

    fn oauth_options() -> oauth::Options {
        oauth::Options {
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("client-secret".to_string()),
            callback_url: "https://parkgate.dev/api/v1/auth/google/callback".to_string(),
            timeout_seconds: 4,
        }
    }

    #[test]
    fn build_configs_applies_options() -> Result<()> {
        let (auth, oauth) = build_configs(auth_options(900, 3600), oauth_options())?;
        assert!(auth.secure_cookies());
        assert_eq!(auth.rotation(), RefreshRotation::Reuse);
        assert_eq!(auth.refresh_cookie_path(), "/api/v1/auth/refresh");
        assert_eq!(oauth.timeout(), Duration::from_secs(4));
        Ok(())
    }

    #[test]
    fn build_configs_rejects_inverted_lifetimes() {
        assert!(build_configs(auth_options(3600, 900), oauth_options()).is_err());
    }
}
