use crate::{
    api::StoreBackend,
    cli::{
        actions::{Action, server::Args},
        commands::{self, auth, oauth},
    },
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);

    let backend = if matches.get_flag(commands::ARG_IN_MEMORY) {
        StoreBackend::InMemory
    } else {
        let dsn = matches
            .get_one::<String>(commands::ARG_DSN)
            .cloned()
            .context("missing required argument: --dsn")?;
        StoreBackend::Postgres { dsn }
    };

    let auth = auth::Options::parse(matches)?;
    let oauth = oauth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        backend,
        auth,
        oauth,
    }))
}
