//! Request filter chain: token validation and the refresh handshake.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::{AuthState, HasAuthBackend};
use super::types::{AuthenticatedUser, RefreshPolicy, SessionEnded};
use crate::db::User;
use crate::jwt::JwtError;

/// Authenticate every request that carries an access token.
///
/// - No access token: continue unauthenticated.
/// - Valid, unrevoked access token: continue as that user.
/// - Expired access token: renew it through [`refresh_session`].
/// - Anything else: 401 and the handler never runs.
///
/// Authenticated responses carry the tokens in effect in both header slots,
/// unless the handler set them itself or ended the session.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let access_token = state
        .headers
        .read_access(request.headers())
        .map(str::to_string);
    let Some(access_token) = access_token else {
        return next.run(request).await;
    };
    let refresh_token = state
        .headers
        .read_refresh(request.headers())
        .map(str::to_string);

    let auth = match resolve(&state, access_token, refresh_token).await {
        Ok(auth) => auth,
        Err(kind) => return ApiAuthError::new(kind).into_response(),
    };

    let access = auth.access_token.clone();
    let refresh = auth.refresh_token.clone();
    request.extensions_mut().insert(auth);

    let mut response = next.run(request).await;
    if response.extensions().get::<SessionEnded>().is_none() {
        state
            .headers
            .write_missing(response.headers_mut(), &access, refresh.as_deref());
    }
    response
}

async fn resolve(
    state: &AuthState,
    access_token: String,
    refresh_token: Option<String>,
) -> Result<AuthenticatedUser, AuthErrorKind> {
    match state.jwt.validate_access_token(&access_token) {
        Ok(claims) => {
            if state
                .revocations()
                .is_revoked(&access_token)
                .await
                .map_err(storage_error)?
            {
                tracing::debug!(sub = %claims.sub, "Rejected revoked access token");
                return Err(AuthErrorKind::TokenRevoked);
            }

            let user = load_user(state, &claims.sub).await?;
            Ok(AuthenticatedUser {
                user,
                claims,
                access_token,
                refresh_token,
            })
        }
        Err(JwtError::Expired) => {
            let refresh_token = refresh_token.ok_or_else(|| {
                tracing::debug!("Expired access token without a refresh token");
                AuthErrorKind::RefreshTokenMissing
            })?;
            refresh_session(state, &refresh_token).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected access token");
            Err(AuthErrorKind::InvalidToken)
        }
    }
}

/// Mint a new access token from a refresh token.
///
/// The refresh token must validate, must not be revoked, and must still be
/// the one stored on the user. [`RefreshPolicy`] is consulted here and
/// nowhere else.
pub async fn refresh_session(
    state: &AuthState,
    refresh_token: &str,
) -> Result<AuthenticatedUser, AuthErrorKind> {
    let refresh_claims = state
        .jwt
        .validate_refresh_token(refresh_token)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected refresh token");
            AuthErrorKind::InvalidRefreshToken
        })?;

    let revocations = state.revocations();
    if revocations
        .is_revoked(refresh_token)
        .await
        .map_err(storage_error)?
    {
        tracing::warn!(sub = %refresh_claims.sub, "Revoked refresh token presented");
        return Err(AuthErrorKind::TokenRevoked);
    }

    let mut user = load_user(state, &refresh_claims.sub).await?;
    if user.refresh_token.as_deref() != Some(refresh_token) {
        tracing::warn!(user_id = %user.user_id, "Superseded refresh token presented");
        return Err(AuthErrorKind::InvalidRefreshToken);
    }

    let access = state
        .jwt
        .create_access_token(&user.user_id)
        .map_err(token_error)?;

    let refresh_token = match state.refresh_policy {
        RefreshPolicy::Reuse => refresh_token.to_string(),
        RefreshPolicy::Rotate => {
            let next = state
                .jwt
                .create_refresh_token(&user.user_id)
                .map_err(token_error)?;
            let swapped = state
                .db
                .users()
                .replace_refresh_token(user.id, refresh_token, &next.token)
                .await
                .map_err(storage_error)?;
            if !swapped {
                // Another request rotated or cleared it first
                return Err(AuthErrorKind::InvalidRefreshToken);
            }
            revocations
                .revoke(refresh_token, refresh_claims.exp)
                .await
                .map_err(storage_error)?;
            user.refresh_token = Some(next.token.clone());
            next.token
        }
    };

    let claims = state
        .jwt
        .validate_access_token(&access.token)
        .map_err(token_error)?;

    tracing::info!(
        user_id = %user.user_id,
        policy = ?state.refresh_policy,
        "Access token refreshed"
    );

    Ok(AuthenticatedUser {
        user,
        claims,
        access_token: access.token,
        refresh_token: Some(refresh_token),
    })
}

async fn load_user(state: &AuthState, user_id: &str) -> Result<User, AuthErrorKind> {
    state
        .db
        .users()
        .get_by_user_id(user_id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| {
            tracing::debug!(sub = %user_id, "Token subject has no user");
            AuthErrorKind::UserNotFound
        })
}

fn storage_error(e: sqlx::Error) -> AuthErrorKind {
    tracing::error!(error = %e, "Storage failure during authentication");
    AuthErrorKind::Internal
}

fn token_error(e: JwtError) -> AuthErrorKind {
    tracing::error!(error = %e, "Failed to issue access token");
    AuthErrorKind::Internal
}
