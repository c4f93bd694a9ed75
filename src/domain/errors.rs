use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Cannot move order from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Invalid input: {message}")]
    InvalidInput {
        field: Option<&'static str>,
        message: String,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invoice available after delivery")]
    InvoiceNotReady,
    #[error("Only the customer who placed the order can rate it")]
    NotOwner,
    #[error("Order not delivered yet")]
    NotDelivered,
    #[error("Order already rated")]
    AlreadyRated,
    #[error("Payment could not be verified")]
    PaymentNotVerified,
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::InvalidInput {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DomainError::Forbidden(message.into())
    }

    pub fn order_not_found() -> Self {
        DomainError::NotFound("Order".to_string())
    }

    pub fn payment_reused() -> Self {
        DomainError::Conflict("Payment already used for another order".to_string())
    }
}
