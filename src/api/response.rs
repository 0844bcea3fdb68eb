//! Success envelope: `{statusCode, message, data}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub struct ResponseMessage<T> {
    status: StatusCode,
    message: String,
    data: Option<T>,
}

impl<T> ResponseMessage<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ResponseMessage<()> {
    /// Message-only response.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Body<T> {
    status_code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> IntoResponse for ResponseMessage<T> {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(Body {
                status_code: self.status.as_u16(),
                message: self.message,
                data: self.data,
            }),
        )
            .into_response()
    }
}
