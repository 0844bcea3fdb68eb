//! The two header slots that carry tokens in both directions.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const DEFAULT_ACCESS_HEADER: &str = "Authorization";
pub const DEFAULT_REFRESH_HEADER: &str = "Refresh-Token";

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HeaderConfigError {
    #[error("'{0}' is not a valid HTTP header name")]
    InvalidName(String),
    #[error("Access and refresh tokens must use different headers")]
    SameHeader,
}

/// Names of the access and refresh token headers. Always distinct.
#[derive(Debug, Clone)]
pub struct TokenHeaders {
    access: HeaderName,
    refresh: HeaderName,
}

impl Default for TokenHeaders {
    fn default() -> Self {
        Self {
            access: axum::http::header::AUTHORIZATION,
            refresh: HeaderName::from_static("refresh-token"),
        }
    }
}

fn parse_name(name: &str) -> Result<HeaderName, HeaderConfigError> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| HeaderConfigError::InvalidName(name.to_string()))
}

impl TokenHeaders {
    /// Header names compare case-insensitively.
    pub fn new(access: &str, refresh: &str) -> Result<Self, HeaderConfigError> {
        let access = parse_name(access)?;
        let refresh = parse_name(refresh)?;
        if access == refresh {
            return Err(HeaderConfigError::SameHeader);
        }
        Ok(Self { access, refresh })
    }

    pub fn access_name(&self) -> &HeaderName {
        &self.access
    }

    pub fn refresh_name(&self) -> &HeaderName {
        &self.refresh
    }

    pub fn read_access<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        read_token(headers, &self.access)
    }

    pub fn read_refresh<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        read_token(headers, &self.refresh)
    }

    /// Set both token headers, replacing existing values.
    pub fn write(&self, headers: &mut HeaderMap, access: &str, refresh: Option<&str>) {
        write_token(headers, &self.access, access);
        if let Some(refresh) = refresh {
            write_token(headers, &self.refresh, refresh);
        }
    }

    /// Set each token header the response does not already carry.
    pub fn write_missing(&self, headers: &mut HeaderMap, access: &str, refresh: Option<&str>) {
        if !headers.contains_key(&self.access) {
            write_token(headers, &self.access, access);
        }
        if let Some(refresh) = refresh {
            if !headers.contains_key(&self.refresh) {
                write_token(headers, &self.refresh, refresh);
            }
        }
    }
}

/// Read a token, with or without a `Bearer ` prefix. Blank values count as absent.
fn read_token<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

fn write_token(headers: &mut HeaderMap, name: &HeaderName, token: &str) {
    match HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, token)) {
        Ok(value) => {
            headers.insert(name.clone(), value);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "Token is not a valid header value"),
    }
}
