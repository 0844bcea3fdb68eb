//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::{DEFAULT_ACCESS_HEADER, DEFAULT_REFRESH_HEADER, RefreshPolicy, TokenHeaders};
use crate::db::Database;
use crate::mail::LogMailer;
use crate::rate_limit::RateLimitSettings;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MAX_ACCESS_TOKEN_MINUTES: u64 = 7 * 24 * 60;
const MAX_REFRESH_TOKEN_DAYS: u64 = 365;
const MAX_TIMEOUT_SECS: u64 = 60 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "studyhall", about = "Bulletin board backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE", default_value = "studyhall.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Lifetime of access tokens, at most one week
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=MAX_ACCESS_TOKEN_MINUTES))]
    pub access_token_minutes: u64,

    /// Lifetime of refresh tokens, at most one year
    #[arg(long, default_value = "14", value_parser = clap::value_parser!(u64).range(1..=MAX_REFRESH_TOKEN_DAYS))]
    pub refresh_token_days: u64,

    /// Header carrying the access token in requests and responses
    #[arg(long, default_value = DEFAULT_ACCESS_HEADER)]
    pub access_header: String,

    /// Header carrying the refresh token in requests and responses
    #[arg(long, default_value = DEFAULT_REFRESH_HEADER)]
    pub refresh_header: String,

    /// Issue a new refresh token on every refresh and revoke the old one
    #[arg(long)]
    pub rotate_refresh_tokens: bool,

    /// Seconds to wait for a database connection or lock before failing
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub storage_timeout_secs: u64,

    /// Seconds to wait for a verification mail to be handed off
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub mail_timeout_secs: u64,

    /// Login attempts allowed per client before throttling to one per second
    #[arg(long, default_value = "10")]
    pub login_burst: u32,

    /// Signups allowed per client per minute
    #[arg(long, default_value = "5")]
    pub signup_per_minute: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: called from main before any other thread is started.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Validate the token header names.
/// Returns None and logs an error if they are unusable.
pub fn parse_token_headers(access: &str, refresh: &str) -> Option<TokenHeaders> {
    match TokenHeaders::new(access, refresh) {
        Ok(headers) => Some(headers),
        Err(e) => {
            error!(access = %access, refresh = %refresh, error = %e, "Invalid token headers");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    token_headers: TokenHeaders,
) -> ServerConfig {
    let refresh_policy = if args.rotate_refresh_tokens {
        RefreshPolicy::Rotate
    } else {
        RefreshPolicy::Reuse
    };

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_token_duration: Duration::from_secs(args.access_token_minutes * 60),
        refresh_token_duration: Duration::from_secs(args.refresh_token_days * 24 * 60 * 60),
        token_headers,
        refresh_policy,
        mailer: Arc::new(LogMailer),
        mail_timeout: Duration::from_secs(args.mail_timeout_secs),
        rate_limits: RateLimitSettings {
            login_burst: args.login_burst,
            signup_per_minute: args.signup_per_minute,
        },
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str, timeout: Duration) -> Option<Database> {
    match Database::open_with_timeout(path, timeout).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
