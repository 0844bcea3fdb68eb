//! JWT token generation and validation.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token, validated by signature and expiry only
    Access,
    /// Long-lived refresh token, also stored on the user record
    Refresh,
}

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID. Keeps two tokens minted in the same second distinct.
    pub jti: String,
    /// Subject (the user's login handle)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Default access token duration: 30 minutes
pub const DEFAULT_ACCESS_TOKEN_DURATION_SECS: u64 = 30 * 60;

/// Default refresh token duration: 2 weeks
pub const DEFAULT_REFRESH_TOKEN_DURATION_SECS: u64 = 14 * 24 * 60 * 60;

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_duration: u64,
    refresh_duration: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and default durations.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_durations(
            secret,
            DEFAULT_ACCESS_TOKEN_DURATION_SECS,
            DEFAULT_REFRESH_TOKEN_DURATION_SECS,
        )
    }

    /// Create a JWT configuration with explicit token lifetimes (seconds).
    pub fn with_durations(secret: &[u8], access_duration: u64, refresh_duration: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_duration,
            refresh_duration,
        }
    }

    pub fn access_duration(&self) -> u64 {
        self.access_duration
    }

    pub fn refresh_duration(&self) -> u64 {
        self.refresh_duration
    }

    /// Create a short-lived access token for the subject.
    pub fn create_access_token(&self, subject: &str) -> Result<IssuedToken, JwtError> {
        self.issue(subject, TokenType::Access, self.access_duration)
    }

    /// Create a long-lived refresh token for the subject.
    pub fn create_refresh_token(&self, subject: &str) -> Result<IssuedToken, JwtError> {
        self.issue(subject, TokenType::Refresh, self.refresh_duration)
    }

    fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        duration: u64,
    ) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + duration;

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            token_type,
            iat: now,
            exp,
        };

        Ok(IssuedToken {
            token: self.encode_claims(&claims)?,
            expires_at: exp,
            duration,
        })
    }

    /// Sign arbitrary claims. Used by token issuance and by tests that need
    /// tokens with hand-picked timestamps.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenType::Access)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenType::Refresh)
    }

    fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::from_decode)?;

        if token_data.claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    /// Signature is valid but the token is past its expiry
    #[error("Token has expired")]
    Expired,
    #[error("Token signature is invalid")]
    BadSignature,
    /// Token could not be parsed or carries invalid claims
    #[error("Malformed token: {0}")]
    Malformed(jsonwebtoken::errors::Error),
    /// Wrong token type (e.g., using refresh token as access token)
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("System time error")]
    TimeError,
}

impl JwtError {
    fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::BadSignature,
            _ => JwtError::Malformed(e),
        }
    }

    /// Whether the failure is recoverable through the refresh handshake.
    pub fn is_expired(&self) -> bool {
        matches!(self, JwtError::Expired)
    }
}
