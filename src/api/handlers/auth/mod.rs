//! Auth handlers and supporting modules.
//!
//! Password and Google sign-in both end in the same place: an access/refresh
//! pair returned in the body and set as cookies. Protected routes go through
//! [`require_access`].

mod cookies;
mod error;
pub(crate) mod google;
pub(crate) mod login;
pub(crate) mod me;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
mod state;
pub(crate) mod types;

pub use principal::require_access;
pub use state::AuthState;
