//! Header-based JWT authentication.
//!
//! Dual-token system: short-lived access tokens (stateless apart from the
//! revocation list) and long-lived refresh tokens (single slot on the user
//! record). The [`authenticate`] middleware runs on every request, resolves
//! the caller, and renews an expired access token from the refresh token.
//! Handlers read the result through the [`Auth`] extractor.

mod errors;
mod extractors;
mod filter;
mod headers;
mod ip;
mod revocation;
mod session;
mod state;
mod types;

pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::Auth;
pub use filter::{authenticate, refresh_session};
pub use headers::{DEFAULT_ACCESS_HEADER, DEFAULT_REFRESH_HEADER, HeaderConfigError, TokenHeaders};
pub use ip::{HasHeadersAndExtensions, client_ip};
pub use revocation::RevocationList;
pub use session::{SessionError, TokenPair, end_session, issue_session};
pub use state::{AuthState, HasAuthBackend};
pub use types::{AuthenticatedUser, RefreshPolicy, SessionEnded};
