//! Token issuance tail shared by password login and OAuth reconciliation.

use tracing::info;

use super::{
    error::AuthError,
    store::{SessionStore, User},
    token::{TokenCodec, TokenPair},
};

/// Issue a fresh pair for `user` and make its refresh token the only live one.
///
/// The pointer write is unconditional: a new login always supersedes whatever
/// session existed before.
pub(crate) async fn start_session(
    codec: &TokenCodec,
    store: &dyn SessionStore,
    user: &User,
) -> Result<TokenPair, AuthError> {
    let pair = codec.issue_pair(user.id, &user.email)?;
    store
        .set_session_pointer(user.id, Some(&pair.refresh_token))
        .await?;
    info!(user_id = %user.id, "session started");
    Ok(pair)
}
