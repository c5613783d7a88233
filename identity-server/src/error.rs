// identity-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::messages::{GraphQlResponse, UNAUTHENTICATED};
use thiserror::Error;

use crate::verify::VerifyError;

/// Errors rendered as GraphQL error payloads
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Request understood but refused; reported with HTTP 200 as GraphQL does
    #[error("{0}")]
    Rejected(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => UNAUTHENTICATED,
            ApiError::BadRequest(_) | ApiError::UnknownOperation(_) => "BAD_USER_INPUT",
            ApiError::Rejected(_) => "FORBIDDEN",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn missing_variable(name: &str) -> Self {
        ApiError::BadRequest(format!("Missing variable: {}", name))
    }
}

impl From<actix::MailboxError> for ApiError {
    fn from(err: actix::MailboxError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        ApiError::Rejected(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::UnknownOperation(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(_) => StatusCode::OK,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            tracing::error!("Request failed: {}", detail);
        }
        HttpResponse::build(self.status_code())
            .json(GraphQlResponse::<serde_json::Value>::error(self.to_string(), Some(self.code())))
    }
}
