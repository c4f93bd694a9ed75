use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The gateway payment that settled an online order. Each gateway order and
/// each payment settles at most one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentReference {
    pub gateway_order_id: String,
    pub payment_id: String,
}

/// A gateway order opened on behalf of a customer, remembered so that the
/// eventual placement can be held to the amount that was actually charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub gateway_order_id: String,
    pub customer_id: Uuid,
    /// Minor units (paise for INR).
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}
