use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    BadRequest {
        field: Option<&'static str>,
        message: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::Unauthorized => AppError::Unauthorized,
            DomainError::Forbidden(_) | DomainError::NotOwner => AppError::Forbidden(message),
            DomainError::NotFound(_) => AppError::NotFound(message),
            DomainError::InvalidInput { field, message } => AppError::BadRequest { field, message },
            DomainError::InvalidTransition { .. }
            | DomainError::InvoiceNotReady
            | DomainError::NotDelivered => AppError::BadRequest {
                field: None,
                message,
            },
            DomainError::Conflict(_) | DomainError::AlreadyRated => AppError::Conflict(message),
            DomainError::PaymentNotVerified => AppError::PaymentRequired(message),
            DomainError::Upstream(_) => AppError::BadGateway(message),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Internal(detail) => {
                error!("Request failed: {detail}");
                json!({ "error": "Internal server error" })
            }
            AppError::BadRequest {
                field: Some(field),
                message,
            } => json!({ "error": message, "field": field }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
