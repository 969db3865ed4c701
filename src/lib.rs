//! # Parkgate
//!
//! `parkgate` owns the session and token lifecycle of the parking API: account
//! registration, password and Google sign-in, short-lived access tokens, and
//! rotating refresh tokens delivered as `HttpOnly` cookies.
//!
//! ## Single active session
//!
//! Every user row carries one `active_refresh_token` pointer. Login replaces it,
//! logout clears it, and a refresh is only honoured when the presented token
//! still matches the pointer. Pointer writes are conditional
//! (`UPDATE ... WHERE active_refresh_token IS NOT DISTINCT FROM $expected`), so two
//! concurrent refreshes of the same token cannot both win.
//!
//! ## Layout
//!
//! - [`session`]: token codec, user store, guard, refresh, credential and Google flows.
//! - [`api`]: axum routes, cookies and the `OpenAPI` document.
//! - [`client`]: an HTTP client that refreshes once on `401` and replays the request.
//! - [`cli`]: argument parsing, telemetry and the `server` action.
//!
//! The schema lives in `sql/schema.sql`.

pub mod api;
pub mod cli;
pub mod client;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
