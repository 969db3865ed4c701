use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_CALLBACK_URL: &str = "google-callback-url";
pub const ARG_PROVIDER_TIMEOUT: &str = "provider-timeout-seconds";

#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: SecretString,
    pub callback_url: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse Google sign-in arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            client_id: read_required(ARG_GOOGLE_CLIENT_ID)?,
            client_secret: SecretString::from(read_required(ARG_GOOGLE_CLIENT_SECRET)?),
            callback_url: read_required(ARG_GOOGLE_CALLBACK_URL)?,
            timeout_seconds: matches
                .get_one::<u64>(ARG_PROVIDER_TIMEOUT)
                .copied()
                .unwrap_or(10),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id")
                .env("PARKGATE_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("PARKGATE_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CALLBACK_URL)
                .long(ARG_GOOGLE_CALLBACK_URL)
                .help("Redirect URI registered with Google, e.g. https://parkgate.dev/api/v1/auth/google/callback")
                .env("PARKGATE_GOOGLE_CALLBACK_URL"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT)
                .long(ARG_PROVIDER_TIMEOUT)
                .help("Timeout for each call to the identity provider")
                .env("PARKGATE_PROVIDER_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..=120)),
        )
}
