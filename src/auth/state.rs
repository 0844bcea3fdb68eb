//! Authentication state traits and macro.

use std::sync::Arc;

use super::headers::TokenHeaders;
use super::revocation::RevocationList;
use super::types::RefreshPolicy;
use crate::db::Database;
use crate::jwt::JwtConfig;

/// Trait for state types that provide what session issuance needs.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    fn token_headers(&self) -> &TokenHeaders;

    fn revocations(&self) -> RevocationList {
        RevocationList::new(self.db().cache())
    }
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `db: Database`
/// - `headers: Arc<TokenHeaders>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub jwt: Arc<JwtConfig>,
///     pub headers: Arc<TokenHeaders>,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn token_headers(&self) -> &$crate::auth::TokenHeaders {
                &self.headers
            }
        }
    };
}

/// State of the filter chain middleware.
#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub headers: Arc<TokenHeaders>,
    pub refresh_policy: RefreshPolicy,
}

crate::impl_has_auth_backend!(AuthState);
