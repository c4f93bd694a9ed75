use std::collections::BTreeSet;

use uuid::Uuid;

use crate::domain::catalog::Product;
use crate::domain::errors::DomainError;
use crate::domain::events::Channel;
use crate::domain::order::Order;
use crate::domain::ports::CatalogRepository;

/// Vendors involved in an order, ascending and without duplicates.
///
/// Items carry the vendor captured at placement. Older records lack it, so
/// those items fall back to the product's current vendor.
pub fn vendor_ids(order: &Order, catalog: &dyn CatalogRepository) -> Result<Vec<Uuid>, DomainError> {
    let mut ids = BTreeSet::new();
    for item in &order.items {
        let vendor = match item.vendor_id {
            Some(id) => Some(id),
            None => catalog
                .find_product(item.product_id)?
                .and_then(|p: Product| p.vendor_id),
        };
        ids.extend(vendor);
    }
    Ok(ids.into_iter().collect())
}

pub fn is_vendor_of(order: &Order, vendor_id: Uuid, catalog: &dyn CatalogRepository) -> Result<bool, DomainError> {
    if order.has_item_from_vendor(vendor_id) {
        return Ok(true);
    }
    Ok(vendor_ids(order, catalog)?.contains(&vendor_id))
}

/// Every real-time room that should hear about a change to `order`.
pub fn addressees(order: &Order, catalog: &dyn CatalogRepository) -> Result<Vec<Channel>, DomainError> {
    let mut channels: Vec<Channel> = vendor_ids(order, catalog)?
        .into_iter()
        .map(Channel::Vendor)
        .collect();
    channels.push(Channel::User(order.customer_id));
    Ok(channels)
}
