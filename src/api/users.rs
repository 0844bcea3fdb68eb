//! Account endpoints: signup, login, logout, withdrawal, profile, password.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::{ApiError, ResultExt};
use super::response::ResponseMessage;
use super::validation::{ValidJson, not_blank};
use crate::account::{self, AccountError, AccountState, ProfileChange};
use crate::auth::{Auth, SessionEnded, TokenHeaders, end_session, issue_session};
use crate::db::{Database, NewUser, User};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::{hash_password, validate_password_strength, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub headers: Arc<TokenHeaders>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let signup_router = Router::new()
        .route("/signup", post(signup))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_signup,
        ));

    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/logout", post(logout))
        .route("/withdraw", put(withdraw))
        .route("/mypage", get(get_my_page).put(update_my_page))
        .route("/password", put(change_password))
        .route("/{id}", get(get_user))
        .with_state(state)
        .merge(signup_router)
        .merge(login_router)
}

// --- Request/Response types ---

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    #[serde(default)]
    #[validate(
        length(min = 10, max = 20, message = "User ID must be 10 to 20 characters"),
        custom(function = "alphanumeric")
    )]
    user_id: String,
    #[serde(default)]
    #[validate(
        length(min = 10, message = "Password must be at least 10 characters"),
        custom(function = "validate_password_strength")
    )]
    password: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    name: String,
    #[serde(default)]
    #[validate(email(message = "Email address is not valid"))]
    email: String,
    introduce: Option<String>,
}

fn alphanumeric(value: &str) -> Result<(), validator::ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("alphanumeric")
            .with_message("User ID may only contain letters and digits".into()))
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    user_id: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    password: String,
}

#[derive(Deserialize, Validate)]
struct PasswordRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    #[validate(custom(function = "not_blank"))]
    name: Option<String>,
    introduce: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    current_password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    current_password: String,
    #[serde(default)]
    #[validate(
        length(min = 10, message = "Password must be at least 10 characters"),
        custom(function = "validate_password_strength")
    )]
    new_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: i64,
    user_id: String,
    name: String,
    email: String,
    introduce: Option<String>,
    state: AccountState,
    created_at: String,
    modified_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            introduce: user.introduce.clone(),
            state: user.state,
            created_at: user.created_at.clone(),
            modified_at: user.updated_at.clone(),
        }
    }
}

/// What anyone may see about a user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicProfile {
    id: i64,
    user_id: String,
    name: String,
    introduce: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: String,
}

// --- Helpers ---

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .db_err("Password hashing task failed")?
        .db_err("Failed to hash password")
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .db_err("Password verification task failed")
}

async fn reload(db: &Database, id: i64) -> Result<User, ApiError> {
    db.users()
        .get_by_id(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| AccountError::UserNotFound.into())
}

fn session_ended(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response.extensions_mut().insert(SessionEnded);
    response
}

// --- Handlers ---

async fn signup(
    State(state): State<UsersState>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users();

    if users
        .user_id_exists(&payload.user_id)
        .await
        .db_err("Failed to check user ID")?
    {
        return Err(AccountError::DuplicateUserId.into());
    }
    if users
        .email_exists(&payload.email)
        .await
        .db_err("Failed to check email")?
    {
        return Err(AccountError::DuplicateEmail.into());
    }

    let password_hash = hash_blocking(payload.password).await?;

    let created = users
        .create(&NewUser {
            user_id: &payload.user_id,
            password_hash: &password_hash,
            name: payload.name.trim(),
            email: &payload.email,
            introduce: payload.introduce.as_deref(),
        })
        .await;

    let id = match created {
        Ok(id) => id,
        // Lost a race against a concurrent signup for the same handle or email
        Err(e)
            if e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation()) =>
        {
            return Err(ApiError::bad_request(
                "User ID or email is already registered",
            ));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    let user = reload(&state.db, id).await?;
    tracing::info!(user_id = %user.user_id, "User signed up");

    Ok(ResponseMessage::created(
        "Signup succeeded",
        UserResponse::from(&user),
    ))
}

async fn login(
    State(state): State<UsersState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .db
        .users()
        .get_by_user_id(&payload.user_id)
        .await
        .db_err("Failed to look up user")?
        .ok_or(AccountError::InvalidCredentials)?;

    if !verify_blocking(payload.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.user_id, "Login with wrong password");
        return Err(AccountError::InvalidCredentials.into());
    }
    account::ensure_live(user.state)?;

    let tokens = issue_session(&state, &user).await?;
    tracing::info!(user_id = %user.user_id, "User logged in");

    let mut response = ResponseMessage::ok(
        "Login succeeded",
        LoginResponse {
            user_id: user.user_id.clone(),
        },
    )
    .into_response();
    state.headers.write(
        response.headers_mut(),
        &tokens.access.token,
        Some(&tokens.refresh.token),
    );
    Ok(response)
}

async fn logout(
    State(state): State<UsersState>,
    Auth(auth): Auth,
) -> Result<Response, ApiError> {
    account::ensure_live(auth.user.state)?;

    end_session(&state, &auth)
        .await
        .db_err("Failed to end session")?;
    tracing::info!(user_id = %auth.user.user_id, "User logged out");

    Ok(session_ended(ResponseMessage::message("Logout succeeded")))
}

async fn withdraw(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    ValidJson(payload): ValidJson<PasswordRequest>,
) -> Result<Response, ApiError> {
    let next = account::withdraw(auth.user.state)?;

    if !verify_blocking(payload.password, auth.user.password_hash.clone()).await? {
        return Err(AccountError::PasswordMismatch.into());
    }

    end_session(&state, &auth)
        .await
        .db_err("Failed to end session")?;
    state
        .db
        .users()
        .deactivate(auth.user.id)
        .await
        .db_err("Failed to withdraw user")?;
    tracing::info!(user_id = %auth.user.user_id, state = ?next, "User withdrew");

    Ok(session_ended(ResponseMessage::ok(
        "Withdrawal succeeded",
        LoginResponse {
            user_id: auth.user.user_id,
        },
    )))
}

async fn get_my_page(Auth(auth): Auth) -> impl IntoResponse {
    ResponseMessage::ok("Profile loaded", UserResponse::from(&auth.user))
}

async fn update_my_page(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;

    if !verify_blocking(payload.current_password, auth.user.password_hash.clone()).await? {
        return Err(AccountError::PasswordMismatch.into());
    }

    let change = ProfileChange {
        name: payload.name.map(|n| n.trim().to_string()),
        introduce: payload.introduce,
    };
    let (name, introduce) = change.apply(&auth.user.name, auth.user.introduce.as_deref());

    state
        .db
        .users()
        .update_profile(auth.user.id, &name, introduce.as_deref())
        .await
        .db_err("Failed to update profile")?;

    let user = reload(&state.db, auth.user.id).await?;
    Ok(ResponseMessage::ok("Profile updated", UserResponse::from(&user)))
}

async fn change_password(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    ValidJson(payload): ValidJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;

    let hash = auth.user.password_hash.clone();

    if !verify_blocking(payload.current_password, hash.clone()).await? {
        return Err(AccountError::PasswordMismatch.into());
    }
    if verify_blocking(payload.new_password.clone(), hash).await? {
        return Err(AccountError::SamePassword.into());
    }

    let new_hash = hash_blocking(payload.new_password).await?;
    state
        .db
        .users()
        .update_password(auth.user.id, &new_hash)
        .await
        .db_err("Failed to update password")?;
    tracing::info!(user_id = %auth.user.user_id, "Password changed");

    let user = reload(&state.db, auth.user.id).await?;
    Ok(ResponseMessage::ok("Password changed", UserResponse::from(&user)))
}

async fn get_user(
    State(state): State<UsersState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = reload(&state.db, id).await?;
    Ok(ResponseMessage::ok(
        "User found",
        PublicProfile {
            id: user.id,
            user_id: user.user_id,
            name: user.name,
            introduce: user.introduce,
        },
    ))
}
