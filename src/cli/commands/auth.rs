use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::session::{Environment, MAX_TOKEN_TTL_SECONDS, RefreshRotation};

pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_API_URL: &str = "api-url";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_REFRESH_ROTATION: &str = "refresh-rotation";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[derive(Debug)]
pub struct Options {
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub jwt_secret: SecretString,
    pub api_url: String,
    pub environment: Environment,
    pub rotation: RefreshRotation,
    pub frontend_base_url: String,
}

impl Options {
    /// Parse token and session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or unparsable.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };
        let read_ttl = |id: &str| -> anyhow::Result<i64> {
            matches
                .get_one::<i64>(id)
                .copied()
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        let environment = read_required(ARG_ENVIRONMENT)?
            .parse::<Environment>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid --{ARG_ENVIRONMENT}"))?;
        let rotation = matches
            .get_one::<String>(ARG_REFRESH_ROTATION)
            .map(|value| value.parse::<RefreshRotation>())
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or_default();

        Ok(Self {
            access_ttl_seconds: read_ttl(ARG_ACCESS_TOKEN_TTL)?,
            refresh_ttl_seconds: read_ttl(ARG_REFRESH_TOKEN_TTL)?,
            jwt_secret: SecretString::from(read_required(ARG_JWT_SECRET)?),
            api_url: read_required(ARG_API_URL)?,
            environment,
            rotation,
            frontend_base_url: read_required(ARG_FRONTEND_BASE_URL)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_session_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token lifetime in seconds")
                .env("PARKGATE_ACCESS_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(0..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token lifetime in seconds, must exceed the access lifetime")
                .env("PARKGATE_REFRESH_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(0..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 signing secret for access and refresh tokens")
                .env("PARKGATE_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_ROTATION)
                .long(ARG_REFRESH_ROTATION)
                .help("Issue a new refresh token on every refresh (rotate) or keep it (reuse)")
                .env("PARKGATE_REFRESH_ROTATION")
                .value_parser(["rotate", "reuse"])
                .default_value("rotate"),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Public API base URL, e.g. https://parkgate.dev/api/v1")
                .env("PARKGATE_API_URL"),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment: development, test or production")
                .env("PARKGATE_ENVIRONMENT"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS")
                .env("PARKGATE_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
}
