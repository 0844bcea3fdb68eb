mod comments;
mod error;
mod likes;
mod mails;
mod posts;
mod response;
mod users;
mod validation;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenHeaders;
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::mail::Mailer;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};
pub use mails::MailState;
pub use posts::PostsState;
pub use response::ResponseMessage;
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    headers: Arc<TokenHeaders>,
    mailer: Arc<dyn Mailer>,
    mail_timeout: Duration,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let mail_state = mails::MailState {
        db: db.clone(),
        mailer,
        timeout: mail_timeout,
    };

    let posts_state = posts::PostsState { db: db.clone() };

    let users_state = users::UsersState {
        db,
        jwt,
        headers,
        rate_limit_config,
    };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/mails", mails::router(mail_state))
        .nest("/posts", posts::router(posts_state))
}
