use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::common::error::DomainError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `RULE_NOT_FOUND`).
    #[schema(value_type = String)]
    code: &'static str,
    /// Human-readable description of the error.
    message: String,
}

/// Standard API error type.
///
/// All variants produce a JSON response matching:
/// `{"error":{"code":"SCREAMING_SNAKE","message":"human-readable"}}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound { code: &'static str, message: String },
    BadRequest { code: &'static str, message: String },
    Conflict { code: &'static str, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            Self::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            Self::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
            }
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::InvalidInput(_) => Self::BadRequest {
                code: "VALIDATION_ERROR",
                message: err.to_string(),
            },
            DomainError::InvalidRuleDefinition(_) => Self::BadRequest {
                code: "INVALID_RULE",
                message: err.to_string(),
            },
            DomainError::NotFound(_) => Self::NotFound {
                code: "NOT_FOUND",
                message: err.to_string(),
            },
            DomainError::NoRulesForResource(_) => Self::NotFound {
                code: "NO_RULES_FOR_RESOURCE",
                message: err.to_string(),
            },
            DomainError::ConcurrencyConflict { .. } => Self::Conflict {
                code: "CONCURRENCY_CONFLICT",
                message: err.to_string(),
            },
            DomainError::SubscriberOverflow(_) | DomainError::Internal(_) => Self::Internal {
                message: err.to_string(),
            },
        }
    }
}
