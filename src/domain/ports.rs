use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalog::{CartLine, Product, UserProfile};
use super::errors::DomainError;
use super::events::DomainEvent;
use super::order::{ListResult, NewOrder, Order, OrderFilter, OrderMutation};
use super::payment::PaymentIntent;

/// A change computed against the locked, current state of an order, plus the
/// event announcing it.
#[derive(Debug, Clone)]
pub struct StagedChange {
    pub mutation: OrderMutation,
    pub event: DomainEvent,
}

/// The state of an order after a committed change and the event describing it.
#[derive(Debug, Clone)]
pub struct Committed {
    pub order: Order,
    pub event: DomainEvent,
}

pub type ChangeFn<'a> = dyn Fn(&Order) -> Result<StagedChange, DomainError> + 'a;

pub trait OrderRepository: Send + Sync + 'static {
    /// Persists a new order together with its opening history entry and the
    /// creation event.
    fn insert(&self, order: NewOrder, event: &DomainEvent) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn find(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError>;
    /// Locks the order, hands its current state to `change` and applies the
    /// returned mutation before releasing the lock. Concurrent callers on the
    /// same order are serialized; an `Err` from `change` aborts without
    /// writing anything.
    fn mutate(&self, id: Uuid, change: &ChangeFn<'_>) -> Result<Committed, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, DomainError>;
}

/// Per-user cart storage. Every call is atomic for its user.
pub trait CartRepository: Send + Sync + 'static {
    fn items(&self, user_id: Uuid) -> Result<Vec<CartLine>, DomainError>;
    /// Adds `delta` to the line's quantity. New lines start at no less than
    /// one and existing lines never drop below one.
    fn add(&self, user_id: Uuid, product_id: Uuid, delta: i32) -> Result<Vec<CartLine>, DomainError>;
    fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<CartLine>, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<(), DomainError>;
}

pub trait SettingsRepository: Send + Sync + 'static {
    fn delivery_charge(&self) -> Result<Option<BigDecimal>, DomainError>;
    fn set_delivery_charge(&self, value: &BigDecimal) -> Result<(), DomainError>;
}

/// Gateway orders opened through this service, keyed by gateway order id.
pub trait PaymentRepository: Send + Sync + 'static {
    fn record_intent(&self, intent: &PaymentIntent) -> Result<(), DomainError>;
    fn find_intent(&self, gateway_order_id: &str) -> Result<Option<PaymentIntent>, DomainError>;
}

#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    /// Stores the image and returns its public URL.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, DomainError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in the currency's minor unit (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_order(&self, amount_minor: i64, receipt: &str) -> Result<GatewayOrder, DomainError>;
}
