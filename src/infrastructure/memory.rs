use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::catalog::{CartLine, Product, UserProfile};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::order::{ListResult, NewOrder, Order, OrderFilter};
use crate::domain::payment::PaymentIntent;
use crate::domain::ports::{
    CartRepository, CatalogRepository, ChangeFn, Committed, OrderRepository, PaymentRepository,
    SettingsRepository,
};

#[derive(Default)]
struct OrderBook {
    orders: HashMap<Uuid, Order>,
    outbox: Vec<DomainEvent>,
}

#[derive(Default)]
struct Catalog {
    products: HashMap<Uuid, Product>,
    users: HashMap<Uuid, UserProfile>,
}

/// Process-local store implementing every repository port.
///
/// Used by tests and local runs without Postgres. Orders sit behind one lock,
/// which gives the same serialization guarantees as the row locks taken by
/// [`super::order_repo::DieselOrderRepository`]. The catalog has its own lock
/// so a change function may look up products while the orders are held.
#[derive(Default)]
pub struct InMemoryStore {
    orders: Mutex<OrderBook>,
    catalog: Mutex<Catalog>,
    carts: Mutex<HashMap<Uuid, Vec<CartLine>>>,
    delivery_charge: Mutex<Option<BigDecimal>>,
    payments: Mutex<HashMap<String, PaymentIntent>>,
}

fn guard<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Internal("in-memory store lock poisoned".to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) -> Result<(), DomainError> {
        guard(&self.catalog)?.products.insert(product.id, product);
        Ok(())
    }

    pub fn add_user(&self, user: UserProfile) -> Result<(), DomainError> {
        guard(&self.catalog)?.users.insert(user.id, user);
        Ok(())
    }

    /// Inserts an order as-is, bypassing placement. Lets callers stage orders
    /// in arbitrary states, including legacy ones without vendor attribution.
    pub fn put_order(&self, order: Order) -> Result<(), DomainError> {
        guard(&self.orders)?.orders.insert(order.id, order);
        Ok(())
    }

    pub fn outbox(&self) -> Result<Vec<DomainEvent>, DomainError> {
        Ok(guard(&self.orders)?.outbox.clone())
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

impl OrderRepository for InMemoryStore {
    fn insert(&self, order: NewOrder, event: &DomainEvent) -> Result<Order, DomainError> {
        let mut state = guard(&self.orders)?;
        if let Some(payment) = &order.payment {
            let reused = state.orders.values().filter_map(|o| o.payment.as_ref()).any(|p| {
                p.gateway_order_id == payment.gateway_order_id || p.payment_id == payment.payment_id
            });
            if reused {
                return Err(DomainError::payment_reused());
            }
        }
        let order = order.into_order();
        state.orders.insert(order.id, order.clone());
        state.outbox.push(event.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(guard(&self.orders)?.orders.get(&id).cloned())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let state = guard(&self.orders)?;
        let all = newest_first(state.orders.values().cloned().collect());
        let total = all.len() as i64;
        let offset = page.saturating_sub(1).max(0).saturating_mul(limit.max(0)) as usize;
        Ok(ListResult {
            items: all.into_iter().skip(offset).take(limit.max(0) as usize).collect(),
            total,
        })
    }

    fn find(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let state = guard(&self.orders)?;
        Ok(newest_first(
            state
                .orders
                .values()
                .filter(|o| filter.matches(o))
                .cloned()
                .collect(),
        ))
    }

    fn mutate(&self, id: Uuid, change: &ChangeFn<'_>) -> Result<Committed, DomainError> {
        let mut state = guard(&self.orders)?;
        let current = state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(DomainError::order_not_found)?;
        let staged = change(&current)?;

        let mut next = current;
        next.apply(staged.mutation, Utc::now());
        state.orders.insert(id, next.clone());
        state.outbox.push(staged.event.clone());
        Ok(Committed {
            order: next,
            event: staged.event,
        })
    }
}

impl CatalogRepository for InMemoryStore {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(guard(&self.catalog)?.products.get(&id).cloned())
    }

    fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        Ok(guard(&self.catalog)?.users.get(&id).cloned())
    }
}

impl CartRepository for InMemoryStore {
    fn items(&self, user_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        Ok(guard(&self.carts)?.get(&user_id).cloned().unwrap_or_default())
    }

    fn add(&self, user_id: Uuid, product_id: Uuid, delta: i32) -> Result<Vec<CartLine>, DomainError> {
        let mut carts = guard(&self.carts)?;
        let cart = carts.entry(user_id).or_default();
        match cart.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(delta).max(1),
            None => cart.push(CartLine {
                product_id,
                quantity: delta.max(1),
            }),
        }
        Ok(cart.clone())
    }

    fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let mut carts = guard(&self.carts)?;
        let cart = carts.entry(user_id).or_default();
        cart.retain(|l| l.product_id != product_id);
        Ok(cart.clone())
    }

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        guard(&self.carts)?.remove(&user_id);
        Ok(())
    }
}

impl SettingsRepository for InMemoryStore {
    fn delivery_charge(&self) -> Result<Option<BigDecimal>, DomainError> {
        Ok(guard(&self.delivery_charge)?.clone())
    }

    fn set_delivery_charge(&self, value: &BigDecimal) -> Result<(), DomainError> {
        *guard(&self.delivery_charge)? = Some(value.clone());
        Ok(())
    }
}

impl PaymentRepository for InMemoryStore {
    fn record_intent(&self, intent: &PaymentIntent) -> Result<(), DomainError> {
        let mut payments = guard(&self.payments)?;
        if payments.contains_key(&intent.gateway_order_id) {
            return Err(DomainError::Conflict(format!(
                "Gateway order {} already recorded",
                intent.gateway_order_id
            )));
        }
        payments.insert(intent.gateway_order_id.clone(), intent.clone());
        Ok(())
    }

    fn find_intent(&self, gateway_order_id: &str) -> Result<Option<PaymentIntent>, DomainError> {
        Ok(guard(&self.payments)?.get(gateway_order_id).cloned())
    }
}
