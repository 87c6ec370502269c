//! Domain error taxonomy shared by the REST and GraphQL surfaces.
//!
//! Every service operation returns `ApiError`; each transport has exactly one
//! mapping point (`IntoResponse` for REST, `ErrorExtensions` for GraphQL) that
//! converts it into the wire shape `{message, data, status}`.

use async_graphql::ErrorExtensions;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// A single field-level validation failure, carried in the `data` array of
/// 422 responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Tagged error type for the whole request path.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        data: Vec<FieldError>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Build a validation error from a field-error list.
    pub fn validation(message: impl Into<String>, data: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            data,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn data(&self) -> &[FieldError] {
        match self {
            Self::Validation { data, .. } => data,
            _ => &[],
        }
    }

    /// Message safe to return to clients. Internal errors are redacted; the
    /// underlying cause is logged at the mapping point instead.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An unknown error occurred!".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

/// Wire shape used by both transports.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    data: Vec<FieldError>,
    status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ErrorBody {
            message: self.public_message(),
            data: self.data().to_vec(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "graphql request failed");
        }

        let status = self.status().as_u16() as i32;
        let data = serde_json::to_value(self.data()).unwrap_or_default();

        async_graphql::Error::new(self.public_message()).extend_with(|_, e| {
            e.set("status", status);
            if let Ok(value) = async_graphql::Value::from_json(data.clone()) {
                e.set("data", value);
            }
        })
    }
}
