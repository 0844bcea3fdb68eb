//! Authentication user types.

use crate::db::User;
use crate::jwt::Claims;

/// The caller of the current request, placed in request extensions by the
/// filter chain once a token has been accepted.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User record as loaded when the request was authenticated
    pub user: User,
    /// Claims of the access token in effect (freshly minted after a refresh)
    pub claims: Claims,
    /// Access token in effect, echoed back in the response headers
    pub access_token: String,
    /// Refresh token the client presented, or the rotated replacement
    pub refresh_token: Option<String>,
}

/// Response extension telling the filter chain not to re-emit tokens,
/// because the handler just invalidated them.
#[derive(Debug, Clone, Copy)]
pub struct SessionEnded;

/// What happens to the refresh token when it is used to renew an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Keep the same refresh token and send it back unchanged.
    #[default]
    Reuse,
    /// Issue a new refresh token, store it, and revoke the old one.
    Rotate,
}
