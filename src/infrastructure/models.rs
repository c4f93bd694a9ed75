use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    cart_items, order_items, order_notes, order_outbox, order_proofs, order_status_history,
    orders, payment_intents, products, settings, users,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub items_total: BigDecimal,
    pub service_charge: BigDecimal,
    pub gst: BigDecimal,
    pub platform_fee: BigDecimal,
    pub delivery_charge: BigDecimal,
    pub tip: BigDecimal,
    pub grand_total: BigDecimal,
    pub delivery_details: Value,
    pub assigned_driver_id: Option<Uuid>,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub rated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payment_gateway_order_id: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub items_total: BigDecimal,
    pub service_charge: BigDecimal,
    pub gst: BigDecimal,
    pub platform_fee: BigDecimal,
    pub delivery_charge: BigDecimal,
    pub tip: BigDecimal,
    pub grand_total: BigDecimal,
    pub delivery_details: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payment_gateway_order_id: Option<String>,
    pub payment_id: Option<String>,
}

/// Column updates for a locked order row. `None` leaves the column alone.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChangeset {
    pub status: Option<String>,
    pub assigned_driver_id: Option<Uuid>,
    pub items_total: Option<BigDecimal>,
    pub service_charge: Option<BigDecimal>,
    pub gst: Option<BigDecimal>,
    pub platform_fee: Option<BigDecimal>,
    pub delivery_charge: Option<BigDecimal>,
    pub tip: Option<BigDecimal>,
    pub grand_total: Option<BigDecimal>,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub rated_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub vendor_id: Option<Uuid>,
    pub vendor_snapshot: Option<Value>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub vendor_id: Option<Uuid>,
    pub vendor_snapshot: Option<Value>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_status_history)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusHistoryRow {
    pub id: i64,
    pub order_id: Uuid,
    pub status: String,
    pub note: String,
    pub by_actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_status_history)]
pub struct NewStatusHistoryRow {
    pub order_id: Uuid,
    pub status: String,
    pub note: String,
    pub by_actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_notes)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NoteRow {
    pub id: i64,
    pub order_id: Uuid,
    pub text: String,
    pub by_actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_notes)]
pub struct NewNoteRow {
    pub order_id: Uuid,
    pub text: String,
    pub by_actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_proofs)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProofRow {
    pub id: i64,
    pub order_id: Uuid,
    pub url: String,
    pub proof_type: String,
    pub uploaded_by: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_proofs)]
pub struct NewProofRow {
    pub order_id: Uuid,
    pub url: String,
    pub proof_type: String,
    pub uploaded_by: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub business_name: Option<String>,
    pub business_address: Option<String>,
    pub business_phone: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub business_name: Option<String>,
    pub business_address: Option<String>,
    pub business_phone: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = settings)]
pub struct NewSettingRow {
    pub key: String,
    pub value: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payment_intents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentIntentRow {
    pub gateway_order_id: String,
    pub customer_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}
