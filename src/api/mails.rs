//! Email verification endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use validator::Validate;

use super::error::{ApiError, ResultExt};
use super::response::ResponseMessage;
use super::validation::ValidJson;
use crate::account::{self, AccountError};
use crate::auth::Auth;
use crate::db::Database;
use crate::mail::{MailError, Mailer, verification_message};
use crate::verification::VerificationCodes;

#[derive(Clone)]
pub struct MailState {
    pub db: Database,
    pub mailer: Arc<dyn Mailer>,
    /// Upper bound on a single delivery attempt
    pub timeout: Duration,
}

pub fn router(state: MailState) -> Router {
    Router::new()
        .route("/", post(send_code))
        .route("/verify", post(verify_code))
        .with_state(state)
}

#[derive(Deserialize, Validate)]
struct VerifyRequest {
    #[serde(default)]
    #[validate(length(equal = 6, message = "Verification codes are 6 digits"))]
    code: String,
}

/// Send a fresh code to the caller's own address.
async fn send_code(
    State(state): State<MailState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    // Fail early for accounts that could never be activated
    account::activate(auth.user.state)?;

    let codes = VerificationCodes::new(state.db.cache());
    let code = codes.issue(&auth.user.email).await?;

    let message = verification_message(&auth.user.email, &code);
    tokio::time::timeout(state.timeout, state.mailer.send(&message))
        .await
        .map_err(|_| MailError::Timeout)??;

    tracing::info!(user_id = %auth.user.user_id, "Verification code sent");
    Ok(ResponseMessage::message("Verification code sent"))
}

async fn verify_code(
    State(state): State<MailState>,
    Auth(auth): Auth,
    ValidJson(payload): ValidJson<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let next = account::activate(auth.user.state)?;

    VerificationCodes::new(state.db.cache())
        .verify(&auth.user.email, payload.code.trim())
        .await?;

    let activated = state
        .db
        .users()
        .transition(auth.user.id, auth.user.state, next)
        .await
        .db_err("Failed to activate user")?;
    if !activated {
        // Withdrawn or verified by another request since authentication
        return Err(AccountError::AlreadyWithdrawn.into());
    }

    tracing::info!(user_id = %auth.user.user_id, "Email verified, account active");
    Ok(ResponseMessage::message("Email verified"))
}
