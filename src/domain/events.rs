use std::fmt;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "orderCreated")]
    OrderCreated,
    #[serde(rename = "orderUpdated")]
    OrderUpdated,
    #[serde(rename = "orderNoteAdded")]
    OrderNoteAdded,
    #[serde(rename = "orderProofUploaded")]
    OrderProofUploaded,
    #[serde(rename = "orderRated")]
    OrderRated,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::OrderCreated => "orderCreated",
            EventKind::OrderUpdated => "orderUpdated",
            EventKind::OrderNoteAdded => "orderNoteAdded",
            EventKind::OrderProofUploaded => "orderProofUploaded",
            EventKind::OrderRated => "orderRated",
        }
    }
}

/// Something happened to an order. Emitted after the change is committed;
/// listeners must treat it as a hint to refetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainEvent {
    pub kind: EventKind,
    pub order_id: Uuid,
    pub payload: Value,
}

impl DomainEvent {
    pub fn new(kind: EventKind, order_id: Uuid, payload: Value) -> Self {
        Self {
            kind,
            order_id,
            payload,
        }
    }
}

/// A real-time destination scoped to one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Vendor(Uuid),
    User(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Vendor(id) => write!(f, "vendor_{id}"),
            Channel::User(id) => write!(f, "user_{id}"),
        }
    }
}
