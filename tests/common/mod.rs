#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use serde_json::Value;
use studyhall::{
    ServerConfig,
    account::AccountState,
    auth::{RefreshPolicy, TokenHeaders},
    create_app,
    db::Database,
    jwt::{Claims, JwtConfig, TokenType, unix_now},
    mail::{MailError, MailMessage, Mailer},
    rate_limit::RateLimitSettings,
};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";
pub const PASSWORD: &str = "Password1!";

/// Mailer that keeps every message for inspection.
#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl CapturingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// The code in the last message sent to `email`.
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|m| m.to == email)
            .and_then(|m| {
                m.body
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|part| part.len() == 6)
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("smtp unavailable".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Tokens as a client holds them after login.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub mailer: Arc<CapturingMailer>,
}

pub async fn create_test_app() -> TestApp {
    TestAppBuilder::new().build().await
}

/// Builder for apps with non-default settings.
pub struct TestAppBuilder {
    policy: RefreshPolicy,
    mailer: CapturingMailer,
    headers: TokenHeaders,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            policy: RefreshPolicy::Reuse,
            mailer: CapturingMailer::default(),
            headers: TokenHeaders::default(),
        }
    }

    pub fn rotate_refresh_tokens(mut self) -> Self {
        self.policy = RefreshPolicy::Rotate;
        self
    }

    pub fn failing_mailer(mut self) -> Self {
        self.mailer = CapturingMailer::failing();
        self
    }

    pub fn headers(mut self, access: &str, refresh: &str) -> Self {
        self.headers = TokenHeaders::new(access, refresh).unwrap();
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let mailer = Arc::new(self.mailer);
        let config = ServerConfig {
            db: db.clone(),
            jwt_secret: JWT_SECRET.to_vec(),
            access_token_duration: Duration::from_secs(30 * 60),
            refresh_token_duration: Duration::from_secs(14 * 24 * 60 * 60),
            token_headers: self.headers,
            refresh_policy: self.policy,
            mailer: mailer.clone(),
            mail_timeout: Duration::from_secs(5),
            rate_limits: RateLimitSettings {
                login_burst: 1000,
                signup_per_minute: 1000,
            },
        };
        TestApp {
            app: create_app(&config),
            db,
            jwt: JwtConfig::new(JWT_SECRET),
            mailer,
        }
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn signup(&self, user_id: &str, email: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/api/users/signup",
            serde_json::json!({
                "userId": user_id,
                "password": PASSWORD,
                "name": user_id,
                "email": email,
            }),
            None,
        ))
        .await
    }

    pub async fn login(&self, user_id: &str, password: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/api/users/login",
            serde_json::json!({ "userId": user_id, "password": password }),
            None,
        ))
        .await
    }

    /// Sign up and log in, leaving the account UNVERIFIED.
    pub async fn unverified_user(&self, user_id: &str) -> Session {
        let email = format!("{}@example.com", user_id);
        let response = self.signup(user_id, &email).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self.login(user_id, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_from(&response).expect("login did not return tokens")
    }

    /// Sign up, activate, and log in.
    pub async fn active_user(&self, user_id: &str) -> Session {
        let session = self.unverified_user(user_id).await;
        let user = self.db.users().get_by_user_id(user_id).await.unwrap().unwrap();
        self.db
            .users()
            .transition(user.id, AccountState::Unverified, AccountState::Active)
            .await
            .unwrap();
        session
    }

    /// An access token for `user_id` that expired a minute ago.
    pub fn expired_access_token(&self, user_id: &str) -> String {
        let now = unix_now().unwrap();
        self.jwt
            .encode_claims(&Claims {
                jti: uuid::Uuid::new_v4().to_string(),
                sub: user_id.to_string(),
                token_type: TokenType::Access,
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap()
    }

    pub async fn create_post(&self, session: &Session, title: &str) -> i64 {
        let response = self
            .send(json_request(
                "POST",
                "/api/posts",
                serde_json::json!({ "title": title, "contents": "Some contents" }),
                Some(session),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        read_json(response).await["data"]["id"].as_i64().unwrap()
    }
}

/// Build a request with the session's tokens in the default header slots.
pub fn request(method: &str, uri: &str, session: Option<&Session>) -> Request<Body> {
    authed(Request::builder().method(method).uri(uri), session)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    body: Value,
    session: Option<&Session>,
) -> Request<Body> {
    authed(Request::builder().method(method).uri(uri), session)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(
    builder: axum::http::request::Builder,
    session: Option<&Session>,
) -> axum::http::request::Builder {
    match session {
        Some(session) => builder
            .header("authorization", format!("Bearer {}", session.access))
            .header("refresh-token", format!("Bearer {}", session.refresh)),
        None => builder,
    }
}

/// Token from a response header, without the `Bearer ` prefix.
pub fn header_token(response: &Response<Body>, name: &str) -> Option<String> {
    let value = response.headers().get(name)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value).to_string())
}

pub fn session_from(response: &Response<Body>) -> Option<Session> {
    Some(Session {
        access: header_token(response, "authorization")?,
        refresh: header_token(response, "refresh-token")?,
    })
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
