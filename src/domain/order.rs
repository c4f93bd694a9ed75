use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;
use uuid::Uuid;

use super::charges::Charges;
use super::errors::DomainError;
use super::payment::PaymentReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Placed,
    Accepted,
    Preparing,
    #[serde(rename = "Ready for Pickup")]
    ReadyForPickup,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Placed,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::ReadyForPickup => "Ready for Pickup",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::invalid("status", format!("Unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(PaymentMethod::Cod),
            "online" => Ok(PaymentMethod::Online),
            other => Err(DomainError::invalid(
                "payment_method",
                format!("Unknown payment method '{other}'"),
            )),
        }
    }
}

/// Vendor contact details frozen into an order item when the order is placed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct VendorSnapshot {
    pub business_name: String,
    pub business_address: String,
    pub business_phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    pub quantity: i32,
    /// `None` on records written before vendor attribution was captured.
    pub vendor_id: Option<Uuid>,
    pub vendor_snapshot: Option<VendorSnapshot>,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

fn default_country() -> String {
    "India".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryDetails {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl DeliveryDetails {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::invalid(field, format!("{field} is required")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntry {
    /// Usually an [`OrderStatus`], but also free-form audit labels such as
    /// "Rejected by Vendor" or price changes.
    pub status: String,
    pub note: String,
    pub by: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Note {
    pub text: String,
    pub by: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Proof {
    pub url: String,
    pub proof_type: String,
    pub uploaded_by: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerRating {
    pub rating: i16,
    pub review: String,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub charges: Charges,
    pub payment_method: PaymentMethod,
    /// Set for online orders once the gateway payment is bound to them.
    pub payment: Option<PaymentReference>,
    pub delivery_details: DeliveryDetails,
    pub status: OrderStatus,
    pub assigned_driver: Option<Uuid>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub notes: Vec<Note>,
    pub proofs: Vec<Proof>,
    pub customer_rating: Option<CustomerRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire shape of [`Order`]. `total_amount` is not stored; it mirrors
/// `charges.grand_total` at serialization time.
#[derive(Serialize)]
struct OrderJson<'a> {
    id: &'a Uuid,
    customer_id: &'a Uuid,
    items: &'a [OrderItem],
    charges: &'a Charges,
    total_amount: &'a BigDecimal,
    payment_method: PaymentMethod,
    payment: &'a Option<PaymentReference>,
    delivery_details: &'a DeliveryDetails,
    status: OrderStatus,
    assigned_driver: &'a Option<Uuid>,
    status_history: &'a [StatusHistoryEntry],
    notes: &'a [Note],
    proofs: &'a [Proof],
    customer_rating: &'a Option<CustomerRating>,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OrderJson {
            id: &self.id,
            customer_id: &self.customer_id,
            items: &self.items,
            charges: &self.charges,
            total_amount: self.total_amount(),
            payment_method: self.payment_method,
            payment: &self.payment,
            delivery_details: &self.delivery_details,
            status: self.status,
            assigned_driver: &self.assigned_driver,
            status_history: &self.status_history,
            notes: &self.notes,
            proofs: &self.proofs,
            customer_rating: &self.customer_rating,
            created_at: &self.created_at,
            updated_at: &self.updated_at,
        }
        .serialize(serializer)
    }
}

impl Order {
    pub fn total_amount(&self) -> &BigDecimal {
        &self.charges.grand_total
    }

    pub fn has_item_from_vendor(&self, vendor_id: Uuid) -> bool {
        self.items.iter().any(|i| i.vendor_id == Some(vendor_id))
    }

    /// Applies `mutation` in memory. Storage backends that cannot run SQL use
    /// this; the Postgres repository mirrors it column by column.
    pub fn apply(&mut self, mutation: OrderMutation, at: DateTime<Utc>) {
        if let Some(status) = mutation.status {
            self.status = status;
        }
        if let Some(driver) = mutation.assigned_driver {
            self.assigned_driver = Some(driver);
        }
        if let Some(charges) = mutation.charges {
            self.charges = charges;
        }
        if let Some(rating) = mutation.rating {
            self.customer_rating = Some(rating);
        }
        self.status_history.extend(mutation.history);
        self.notes.extend(mutation.notes);
        self.proofs.extend(mutation.proofs);
        self.updated_at = at;
    }
}

impl NewOrder {
    pub fn opening_entry(&self) -> StatusHistoryEntry {
        StatusHistoryEntry {
            status: OrderStatus::Placed.to_string(),
            note: "Order placed".to_string(),
            by: self.placed_by.clone(),
            at: self.placed_at,
        }
    }

    pub fn into_order(self) -> Order {
        let opening = self.opening_entry();
        Order {
            id: self.id,
            customer_id: self.customer_id,
            items: self.items,
            charges: self.charges,
            payment_method: self.payment_method,
            payment: self.payment,
            delivery_details: self.delivery_details,
            status: OrderStatus::Placed,
            assigned_driver: None,
            status_history: vec![opening],
            notes: Vec::new(),
            proofs: Vec::new(),
            customer_rating: None,
            created_at: self.placed_at,
            updated_at: self.placed_at,
        }
    }
}

/// Everything needed to persist a freshly placed order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub charges: Charges,
    pub payment_method: PaymentMethod,
    pub payment: Option<PaymentReference>,
    pub delivery_details: DeliveryDetails,
    pub placed_by: String,
    pub placed_at: DateTime<Utc>,
}

/// Changes applied to a locked order row in one atomic step.
///
/// List fields are appended, never replaced.
#[derive(Debug, Clone, Default)]
pub struct OrderMutation {
    pub status: Option<OrderStatus>,
    pub assigned_driver: Option<Uuid>,
    pub charges: Option<Charges>,
    pub rating: Option<CustomerRating>,
    pub history: Vec<StatusHistoryEntry>,
    pub notes: Vec<Note>,
    pub proofs: Vec<Proof>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Selection criteria for order lookups beyond a single id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    Customer(Uuid),
    /// Orders with at least one item attributed to this vendor at placement.
    ItemVendor(Uuid),
    /// Orders with at least one item lacking a vendor attribution.
    UnattributedItems,
    Product(Uuid),
    AwaitingDriver,
    Driver {
        driver_id: Uuid,
        status: Option<OrderStatus>,
    },
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match *self {
            OrderFilter::Customer(id) => order.customer_id == id,
            OrderFilter::ItemVendor(id) => order.has_item_from_vendor(id),
            OrderFilter::UnattributedItems => order.items.iter().any(|i| i.vendor_id.is_none()),
            OrderFilter::Product(id) => order.items.iter().any(|i| i.product_id == id),
            OrderFilter::AwaitingDriver => {
                order.status == OrderStatus::ReadyForPickup && order.assigned_driver.is_none()
            }
            OrderFilter::Driver { driver_id, status } => {
                order.assigned_driver == Some(driver_id)
                    && status.map_or(true, |s| order.status == s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_display_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_invalid_input() {
        let err = "Shipped".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidInput {
                field: Some("status"),
                ..
            }
        ));
    }

    #[test]
    fn status_serializes_with_spaces() {
        let json = serde_json::to_string(&OrderStatus::ReadyForPickup).unwrap();
        assert_eq!(json, "\"Ready for Pickup\"");
    }

    #[test]
    fn only_delivered_and_cancelled_are_terminal() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Delivered, OrderStatus::Cancelled]);
    }

    #[test]
    fn serialized_order_carries_total_amount_from_grand_total() {
        let charges = Charges::compute(
            &BigDecimal::from(250),
            &BigDecimal::from(30),
            &BigDecimal::from(0),
        )
        .unwrap();
        let mut order = NewOrder {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            items: Vec::new(),
            charges,
            payment_method: PaymentMethod::Cod,
            payment: None,
            delivery_details: DeliveryDetails {
                full_name: "Asha".into(),
                phone: "9000000000".into(),
                email: None,
                address_line1: "12 MG Road".into(),
                address_line2: None,
                city: "Pune".into(),
                state: "MH".into(),
                postal_code: "411001".into(),
                country: default_country(),
                latitude: None,
                longitude: None,
            },
            placed_by: "Asha".into(),
            placed_at: Utc::now(),
        }
        .into_order();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["total_amount"], json["charges"]["grand_total"]);

        order.charges = order.charges.with_delivery_charge(&BigDecimal::from(45)).unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["total_amount"], json["charges"]["grand_total"]);
        assert_eq!(json["status"], "Placed");
        assert!(json["payment"].is_null());
    }

    #[test]
    fn delivery_details_require_address_fields() {
        let details = DeliveryDetails {
            full_name: "Asha".into(),
            phone: "9000000000".into(),
            email: None,
            address_line1: "  ".into(),
            address_line2: None,
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: default_country(),
            latitude: None,
            longitude: None,
        };
        let err = details.validate().unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidInput {
                field: Some("address_line1"),
                ..
            }
        ));
    }
}
