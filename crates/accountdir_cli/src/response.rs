//! HTTP-flavoured answers printed by the shell.

use accountdir_core::ManagerError;
use log::error;
use serde::Serialize;
use serde_json::{json, Value};

/// Status codes the shell answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Created,
    BadRequest,
    NotFound,
    Conflict,
    UnprocessableEntity,
    InternalError,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::UnprocessableEntity => 422,
            Self::InternalError => 500,
        }
    }
}

/// One answer line: `{"status": <code>, "body": <json>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn success<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status: status.as_u16(),
                body,
            },
            Err(err) => {
                error!("event=response_encode module=cli status=error error={err}");
                Self::detail(StatusCode::InternalError, "Response encoding failed")
            }
        }
    }

    /// Error answer carrying `{"detail": <text>}`.
    pub fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            body: json!({ "detail": detail.into() }),
        }
    }

    pub fn from_manager_error(err: &ManagerError) -> Self {
        let status = match err {
            ManagerError::NotFound(_) => StatusCode::NotFound,
            ManagerError::Conflict(_) => StatusCode::Conflict,
            ManagerError::Store(_) => StatusCode::InternalError,
        };
        Self::detail(status, err.detail())
    }

    /// Whether the answer reports an infrastructure failure.
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}
