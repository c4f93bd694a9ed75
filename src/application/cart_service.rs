use std::sync::Arc;

use uuid::Uuid;

use crate::domain::actor::{Actor, Role};
use crate::domain::catalog::{CartItemView, CartLine, CartView};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogRepository};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { carts, catalog }
    }

    /// Joins cart lines with current product names and prices. Lines whose
    /// product no longer exists are left out.
    fn view(&self, lines: Vec<CartLine>) -> Result<CartView, DomainError> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if let Some(product) = self.catalog.find_product(line.product_id)? {
                items.push(CartItemView {
                    product_id: product.id,
                    name: product.name,
                    price: product.price,
                    quantity: line.quantity,
                });
            }
        }
        Ok(CartView { items })
    }

    pub fn get(&self, actor: &Actor) -> Result<CartView, DomainError> {
        actor.require(Role::Customer, "use a cart")?;
        let lines = self.carts.items(actor.user_id)?;
        self.view(lines)
    }

    pub fn add(&self, actor: &Actor, product_id: Uuid, quantity: i32) -> Result<CartView, DomainError> {
        actor.require(Role::Customer, "use a cart")?;
        if self.catalog.find_product(product_id)?.is_none() {
            return Err(DomainError::NotFound(format!("Product {product_id}")));
        }
        let lines = self.carts.add(actor.user_id, product_id, quantity)?;
        self.view(lines)
    }

    pub fn remove(&self, actor: &Actor, product_id: Uuid) -> Result<CartView, DomainError> {
        actor.require(Role::Customer, "use a cart")?;
        let lines = self.carts.remove(actor.user_id, product_id)?;
        self.view(lines)
    }

    pub fn clear(&self, actor: &Actor) -> Result<CartView, DomainError> {
        actor.require(Role::Customer, "use a cart")?;
        self.carts.clear(actor.user_id)?;
        Ok(CartView { items: Vec::new() })
    }
}
