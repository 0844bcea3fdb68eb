pub mod account;
pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod likes;
pub mod mail;
pub mod password;
pub mod rate_limit;
pub mod verification;

use api::create_api_router;
use auth::{AuthState, RefreshPolicy, TokenHeaders, authenticate};
use axum::{Router, middleware};
use db::Database;
use jwt::JwtConfig;
use mail::Mailer;
use rate_limit::{RateLimitConfig, RateLimitSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    pub access_token_duration: Duration,
    pub refresh_token_duration: Duration,
    /// Header slots carrying the tokens
    pub token_headers: TokenHeaders,
    /// Whether a refresh also replaces the refresh token
    pub refresh_policy: RefreshPolicy,
    /// Delivers verification codes
    pub mailer: Arc<dyn Mailer>,
    pub mail_timeout: Duration,
    pub rate_limits: RateLimitSettings,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::with_durations(
        &config.jwt_secret,
        config.access_token_duration.as_secs(),
        config.refresh_token_duration.as_secs(),
    ));
    let headers = Arc::new(config.token_headers.clone());

    let auth_state = AuthState {
        db: config.db.clone(),
        jwt: jwt.clone(),
        headers: headers.clone(),
        refresh_policy: config.refresh_policy,
    };

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        headers,
        config.mailer.clone(),
        config.mail_timeout,
        Arc::new(RateLimitConfig::new(config.rate_limits)),
    );

    Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn_with_state(auth_state, authenticate))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
