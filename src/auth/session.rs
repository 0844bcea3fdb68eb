//! Issuing and ending sessions (login, logout, withdrawal).

use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::User;
use crate::jwt::{IssuedToken, JwtError};

/// Freshly issued access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Token error: {0}")]
    Token(#[from] JwtError),
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Issue a new token pair and make its refresh token the user's only live one.
pub async fn issue_session<S: HasAuthBackend>(
    state: &S,
    user: &User,
) -> Result<TokenPair, SessionError> {
    let access = state.jwt().create_access_token(&user.user_id)?;
    let refresh = state.jwt().create_refresh_token(&user.user_id)?;

    state
        .db()
        .users()
        .set_refresh_token(user.id, Some(&refresh.token))
        .await?;

    tracing::info!(user_id = %user.user_id, "Session issued");
    Ok(TokenPair { access, refresh })
}

/// Revoke every token of the caller's session and clear the stored refresh token.
///
/// Both the refresh token the client sent and the one on record are revoked;
/// they differ only when another device has logged in since.
pub async fn end_session<S: HasAuthBackend>(
    state: &S,
    auth: &AuthenticatedUser,
) -> Result<(), sqlx::Error> {
    let revocations = state.revocations();
    revocations
        .revoke(&auth.access_token, auth.claims.exp)
        .await?;

    let presented = auth.refresh_token.as_deref();
    let stored = auth.user.refresh_token.as_deref();
    for token in [presented, stored.filter(|s| Some(*s) != presented)]
        .into_iter()
        .flatten()
    {
        // Expired or foreign refresh tokens are already useless
        if let Ok(claims) = state.jwt().validate_refresh_token(token) {
            revocations.revoke(token, claims.exp).await?;
        }
    }

    state.db().users().set_refresh_token(auth.user.id, None).await?;

    tracing::info!(user_id = %auth.user.user_id, "Session ended");
    Ok(())
}
