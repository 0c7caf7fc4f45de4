//! HTTP error mapping.
//!
//! Clients get a status code and a generic `{"error": ...}` body; real
//! causes are logged server-side where the error is mapped.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use super::types::ErrorResponse;
use crate::task::LifecycleError;

/// Error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    /// 500 with a generic client message; the cause is logged here.
    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!("{}: {}", message, cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    /// Map a lifecycle failure, using `internal_message` for the opaque
    /// 500 case.
    pub fn from_lifecycle(e: LifecycleError, internal_message: &str) -> Self {
        match e {
            LifecycleError::NotFound => Self::not_found("Task not found"),
            LifecycleError::AlreadyRunning => Self::conflict("Task is already executing"),
            LifecycleError::Task(task_err) => Self::validation(task_err.to_string()),
            LifecycleError::Store(store_err) => Self::internal(internal_message, store_err),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
