//! Account lifecycle and profile rules.
//!
//! Transitions are pure functions over [`AccountState`]; the stores only
//! persist whatever these functions return.

use serde::{Deserialize, Serialize};

/// Account lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountState {
    Unverified,
    Active,
    Deactivated,
}

impl AccountState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountState::Unverified => "unverified",
            AccountState::Active => "active",
            AccountState::Deactivated => "deactivated",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => AccountState::Active,
            "deactivated" => AccountState::Deactivated,
            _ => AccountState::Unverified,
        }
    }
}

/// Business-rule violations for identities.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("User ID is already taken")]
    DuplicateUserId,
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid user ID or password")]
    InvalidCredentials,
    #[error("Password does not match")]
    PasswordMismatch,
    #[error("New password must differ from the current password")]
    SamePassword,
    #[error("Account has already been withdrawn")]
    AlreadyWithdrawn,
    #[error("Email has already been verified")]
    AlreadyVerified,
}

/// UNVERIFIED -> ACTIVE after a successful email verification.
pub fn activate(state: AccountState) -> Result<AccountState, AccountError> {
    match state {
        AccountState::Unverified => Ok(AccountState::Active),
        AccountState::Active => Err(AccountError::AlreadyVerified),
        AccountState::Deactivated => Err(AccountError::AlreadyWithdrawn),
    }
}

/// Any live account -> DEACTIVATED. Password confirmation happens before this.
pub fn withdraw(state: AccountState) -> Result<AccountState, AccountError> {
    match state {
        AccountState::Deactivated => Err(AccountError::AlreadyWithdrawn),
        AccountState::Unverified | AccountState::Active => Ok(AccountState::Deactivated),
    }
}

/// A withdrawn account can still read, but every write is refused.
pub fn ensure_live(state: AccountState) -> Result<(), AccountError> {
    if state == AccountState::Deactivated {
        return Err(AccountError::AlreadyWithdrawn);
    }
    Ok(())
}

/// Partial profile edit. Absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChange {
    pub name: Option<String>,
    pub introduce: Option<String>,
}

impl ProfileChange {
    /// Resolve the edit against the current values, returning `(name, introduce)`.
    pub fn apply(self, name: &str, introduce: Option<&str>) -> (String, Option<String>) {
        (
            self.name.unwrap_or_else(|| name.to_string()),
            self.introduce.or_else(|| introduce.map(str::to_string)),
        )
    }
}
