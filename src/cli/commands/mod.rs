pub mod auth;
pub mod logging;
pub mod oauth;

use clap::{
    Arg, ArgAction, ArgGroup, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_IN_MEMORY: &str = "in-memory";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("parkgate")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("PARKGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("PARKGATE_DSN"),
        )
        .arg(
            Arg::new(ARG_IN_MEMORY)
                .long(ARG_IN_MEMORY)
                .help("Keep users in memory instead of Postgres (development only)")
                .env("PARKGATE_IN_MEMORY")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("store")
                .args([ARG_DSN, ARG_IN_MEMORY])
                .required(true)
                .multiple(false),
        );

    let command = auth::with_args(command);
    let command = oauth::with_args(command);
    logging::with_args(command)
}
