use sqlx::sqlite::SqlitePool;

use crate::account::AccountState;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    /// Public login handle, also the `sub` claim of every token.
    pub user_id: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub introduce: Option<String>,
    pub state: AccountState,
    /// The single live refresh token. Login overwrites it, logout clears it.
    pub refresh_token: Option<String>,
    pub status_changed_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    user_id: String,
    password_hash: String,
    name: String,
    email: String,
    introduce: Option<String>,
    state: String,
    refresh_token: Option<String>,
    status_changed_at: String,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            password_hash: row.password_hash,
            name: row.name,
            email: row.email,
            introduce: row.introduce,
            state: AccountState::from_str(&row.state),
            refresh_token: row.refresh_token,
            status_changed_at: row.status_changed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields supplied at signup.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub user_id: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub introduce: Option<&'a str>,
}

macro_rules! select_user {
    ($filter:literal) => {
        concat!(
            "SELECT id, user_id, password_hash, name, email, introduce, state, refresh_token, ",
            "status_changed_at, created_at, updated_at FROM users WHERE ",
            $filter
        )
    };
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new unverified user. Returns the row ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (user_id, password_hash, name, email, introduce, state)
             VALUES (?, ?, ?, ?, ?, 'unverified')",
        )
        .bind(user.user_id)
        .bind(user.password_hash)
        .bind(user.name)
        .bind(user.email)
        .bind(user.introduce)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by login handle.
    pub async fn get_by_user_id(&self, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(select_user!("user_id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by row ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(select_user!("id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(select_user!("email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    pub async fn user_id_exists(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Replace the stored refresh token. `None` clears it.
    pub async fn set_refresh_token(
        &self,
        id: i64,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Swap the stored refresh token only if it still holds `current`.
    /// Returns false when another session already replaced it.
    pub async fn replace_refresh_token(
        &self,
        id: i64,
        current: &str,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ? AND refresh_token = ?")
                .bind(next)
                .bind(id)
                .bind(current)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an account from `from` to `to`. Returns false, changing nothing,
    /// when the stored state is no longer `from`.
    pub async fn transition(
        &self,
        id: i64,
        from: AccountState,
        to: AccountState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET state = ?, status_changed_at = datetime('now'),
             updated_at = datetime('now') WHERE id = ? AND state = ?",
        )
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Withdraw an account: mark it deactivated and drop its refresh token.
    pub async fn deactivate(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET state = 'deactivated', refresh_token = NULL,
             status_changed_at = datetime('now'), updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_profile(
        &self,
        id: i64,
        name: &str,
        introduce: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET name = ?, introduce = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(name)
        .bind(introduce)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
