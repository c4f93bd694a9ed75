use bigdecimal::BigDecimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::actor::Role;
use super::order::VendorSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub business_name: Option<String>,
    pub business_address: Option<String>,
    pub business_phone: Option<String>,
}

impl UserProfile {
    pub fn vendor_snapshot(&self) -> VendorSnapshot {
        VendorSnapshot {
            business_name: self.business_name.clone().unwrap_or_default(),
            business_address: self.business_address.clone().unwrap_or_default(),
            business_phone: self.business_phone.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartItemView {
    pub product_id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartItemView>,
}
