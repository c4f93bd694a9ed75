use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::addressees::{is_vendor_of, vendor_ids};
use super::blocking;
use super::payment_service::{PaymentConfirmation, PaymentService};
use super::settings_service::SettingsService;
use crate::domain::actor::{Actor, Role};
use crate::domain::charges::Charges;
use crate::domain::errors::DomainError;
use crate::domain::events::{DomainEvent, EventKind};
use crate::domain::lifecycle;
use crate::domain::order::{
    CustomerRating, DeliveryDetails, ListResult, NewOrder, Note, Order, OrderFilter, OrderItem,
    OrderMutation, OrderStatus, PaymentMethod, Proof, StatusHistoryEntry,
};
use crate::domain::ports::{
    CartRepository, CatalogRepository, ChangeFn, Committed, ImageStore, OrderRepository,
    StagedChange,
};
use crate::invoice::render_invoice;
use crate::realtime::EventBus;

pub const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PROOF_TYPE: &str = "delivery";

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub items: Vec<ItemRequest>,
    pub delivery_details: DeliveryDetails,
    pub payment_method: PaymentMethod,
    pub tip: Option<BigDecimal>,
    pub payment: Option<PaymentConfirmation>,
}

#[derive(Debug, Clone)]
pub struct ProofUpload {
    pub proof_type: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// ── Read models ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DriverStats {
    pub total_deliveries: usize,
    #[schema(value_type = String)]
    pub total_earnings: BigDecimal,
    /// Mean customer rating over rated deliveries, one decimal. `None` until
    /// the first rating arrives.
    pub average_rating: Option<f64>,
    pub active_deliveries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: usize,
}

fn mean_rating(ratings: &[i16]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
    Some((sum / ratings.len() as f64 * 10.0).round() / 10.0)
}

fn summarize<'a>(orders: impl IntoIterator<Item = &'a Order>) -> RatingSummary {
    let ratings: Vec<i16> = orders
        .into_iter()
        .filter(|o| o.status == OrderStatus::Delivered)
        .filter_map(|o| o.customer_rating.as_ref().map(|r| r.rating))
        .collect();
    RatingSummary {
        average_rating: mean_rating(&ratings).unwrap_or(0.0),
        total_reviews: ratings.len(),
    }
}

fn status_event(order_id: Uuid, status: &str) -> DomainEvent {
    DomainEvent::new(EventKind::OrderUpdated, order_id, json!({ "status": status }))
}

// ── Service ──────────────────────────────────────────────────────────────────

/// Every way an order can change. Each mutation locks the order, validates
/// against its current state, commits, and only then announces itself on the
/// event bus.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
    settings: SettingsService,
    images: Arc<dyn ImageStore>,
    payments: PaymentService,
    bus: EventBus,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        carts: Arc<dyn CartRepository>,
        settings: SettingsService,
        images: Arc<dyn ImageStore>,
        payments: PaymentService,
        bus: EventBus,
    ) -> Self {
        Self {
            orders,
            catalog,
            carts,
            settings,
            images,
            payments,
            bus,
        }
    }

    fn commit(&self, id: Uuid, change: &ChangeFn<'_>) -> Result<Order, DomainError> {
        let Committed { order, event } = self.orders.mutate(id, change)?;
        self.bus.publish(event);
        Ok(order)
    }

    fn load(&self, id: Uuid) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(id)?
            .ok_or_else(DomainError::order_not_found)
    }

    fn is_vendor_of(&self, order: &Order, actor: &Actor) -> Result<bool, DomainError> {
        if !actor.is(Role::Vendor) {
            return Ok(false);
        }
        is_vendor_of(order, actor.user_id, self.catalog.as_ref())
    }

    fn can_view(&self, order: &Order, actor: &Actor) -> Result<bool, DomainError> {
        Ok(match actor.role {
            Role::Admin => true,
            Role::Customer => order.customer_id == actor.user_id,
            Role::Driver => {
                order.assigned_driver == Some(actor.user_id)
                    || OrderFilter::AwaitingDriver.matches(order)
            }
            Role::Vendor => self.is_vendor_of(order, actor)?,
        })
    }

    /// Parties who may write to an order. Unlike [`Self::can_view`], a driver
    /// must hold the order; browsing the pickup queue grants no write access.
    fn is_party_to(&self, order: &Order, actor: &Actor) -> Result<bool, DomainError> {
        Ok(match actor.role {
            Role::Driver => order.assigned_driver == Some(actor.user_id),
            _ => self.can_view(order, actor)?,
        })
    }

    /// Vendor staff rights: the admin, or a vendor selling something in the
    /// order.
    fn require_vendor_staff(&self, order: &Order, actor: &Actor, action: &str) -> Result<(), DomainError> {
        if actor.is(Role::Admin) || self.is_vendor_of(order, actor)? {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!("Only the order's vendor or an admin can {action}")))
        }
    }

    // ── Placement ────────────────────────────────────────────────────────────

    fn snapshot_item(&self, request: &ItemRequest) -> Result<OrderItem, DomainError> {
        if request.quantity <= 0 {
            return Err(DomainError::invalid("quantity", "Quantity must be at least 1"));
        }
        let product = self
            .catalog
            .find_product(request.product_id)?
            .ok_or_else(|| DomainError::NotFound(format!("Product {}", request.product_id)))?;
        let vendor_snapshot = match product.vendor_id {
            Some(vendor_id) => self.catalog.find_user(vendor_id)?.map(|v| v.vendor_snapshot()),
            None => None,
        };
        Ok(OrderItem {
            product_id: product.id,
            product_name: product.name,
            unit_price: product.price,
            quantity: request.quantity,
            vendor_id: product.vendor_id,
            vendor_snapshot,
        })
    }

    pub fn place_order(&self, actor: &Actor, input: PlaceOrder) -> Result<Order, DomainError> {
        actor.require(Role::Customer, "place an order")?;
        if input.items.is_empty() {
            return Err(DomainError::invalid("items", "At least one item is required"));
        }
        input.delivery_details.validate()?;
        let verified = match input.payment_method {
            PaymentMethod::Online => {
                let confirmation = input.payment.as_ref().ok_or(DomainError::PaymentNotVerified)?;
                Some(self.payments.verify(actor, confirmation)?)
            }
            PaymentMethod::Cod => None,
        };

        let items = input
            .items
            .iter()
            .map(|r| self.snapshot_item(r))
            .collect::<Result<Vec<_>, _>>()?;
        let items_total = items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.line_total());
        let tip = input.tip.unwrap_or_else(|| BigDecimal::from(0));
        let charges = Charges::compute(&items_total, &self.settings.delivery_charge()?, &tip)?;
        let payment = verified
            .map(|v| v.settle(&charges.grand_total))
            .transpose()?;

        let new_order = NewOrder {
            id: Uuid::new_v4(),
            customer_id: actor.user_id,
            items,
            charges,
            payment_method: input.payment_method,
            payment,
            delivery_details: input.delivery_details,
            placed_by: actor.label(),
            placed_at: Utc::now(),
        };
        let event = DomainEvent::new(
            EventKind::OrderCreated,
            new_order.id,
            json!({ "message": "New order placed" }),
        );
        let order = self.orders.insert(new_order, &event)?;

        if let Err(e) = self.carts.clear(actor.user_id) {
            warn!("Order {} placed but the cart of {} was not cleared: {e}", order.id, actor.user_id);
        }
        info!(
            "Order {} placed by {} for {}",
            order.id,
            actor.user_id,
            order.total_amount()
        );
        self.bus.publish(event);
        Ok(order)
    }

    // ── Status changes ───────────────────────────────────────────────────────

    /// Exclusive driver claim. Runs under the order lock, so of two drivers
    /// racing for the same order exactly one gets it.
    pub fn assign_driver(&self, id: Uuid, actor: &Actor) -> Result<Order, DomainError> {
        actor.require(Role::Driver, "claim an order")?;
        let order = self.commit(id, &|current| {
            if let Some(holder) = current.assigned_driver {
                if holder != actor.user_id {
                    return Err(DomainError::Conflict(
                        "Order already assigned to another driver".to_string(),
                    ));
                }
            }
            let t = lifecycle::transition(
                current.status,
                OrderStatus::OutForDelivery,
                actor,
                "Picked up by driver",
                Utc::now(),
            )?;
            Ok(StagedChange {
                mutation: OrderMutation {
                    status: Some(t.to),
                    assigned_driver: Some(actor.user_id),
                    history: vec![t.entry],
                    ..Default::default()
                },
                event: status_event(current.id, t.to.as_str()),
            })
        })?;
        info!("Order {id} claimed by driver {}", actor.user_id);
        Ok(order)
    }

    /// Completes a delivery. The driver confirms the delivery fee; without
    /// one the current setting applies.
    pub fn mark_delivered(
        &self,
        id: Uuid,
        actor: &Actor,
        delivery_charge: Option<BigDecimal>,
    ) -> Result<Order, DomainError> {
        actor.require(Role::Driver, "mark an order as delivered")?;
        let fee = match delivery_charge {
            Some(fee) => fee,
            None => self.settings.delivery_charge()?,
        };
        self.commit(id, &|current| {
            if current.assigned_driver != Some(actor.user_id) {
                return Err(DomainError::forbidden("You are not assigned to this order"));
            }
            let t = lifecycle::transition(
                current.status,
                OrderStatus::Delivered,
                actor,
                "Delivered to customer",
                Utc::now(),
            )?;
            let charges = current.charges.with_delivery_charge(&fee)?;
            Ok(StagedChange {
                mutation: OrderMutation {
                    status: Some(t.to),
                    charges: Some(charges),
                    history: vec![t.entry],
                    ..Default::default()
                },
                event: status_event(current.id, t.to.as_str()),
            })
        })
    }

    pub fn cancel(&self, id: Uuid, actor: &Actor, reason: Option<String>) -> Result<Order, DomainError> {
        let note = reason.unwrap_or_else(|| format!("Cancelled by {}", actor.role));
        self.commit(id, &|current| {
            match actor.role {
                Role::Admin => {}
                Role::Customer if current.customer_id == actor.user_id => {}
                _ => return Err(DomainError::forbidden("Not authorized to cancel this order")),
            }
            let t = lifecycle::transition(current.status, OrderStatus::Cancelled, actor, &note, Utc::now())?;
            Ok(StagedChange {
                mutation: OrderMutation {
                    status: Some(t.to),
                    history: vec![t.entry],
                    ..Default::default()
                },
                event: status_event(current.id, t.to.as_str()),
            })
        })
    }

    pub fn vendor_reject(&self, id: Uuid, actor: &Actor, reason: Option<String>) -> Result<Order, DomainError> {
        actor.require(Role::Vendor, "reject an order")?;
        let note = reason.unwrap_or_else(|| "Rejected by vendor".to_string());
        self.commit(id, &|current| {
            if !self.is_vendor_of(current, actor)? {
                return Err(DomainError::forbidden("This order has no items from your store"));
            }
            let t = lifecycle::vendor_reject(current.status, actor, &note, Utc::now())?;
            Ok(StagedChange {
                mutation: OrderMutation {
                    status: Some(t.to),
                    history: vec![t.entry],
                    ..Default::default()
                },
                event: status_event(current.id, t.to.as_str()),
            })
        })
    }

    /// Generic vendor/admin progression. The driver-owned edges exist in the
    /// lifecycle but only a driver may take them, through
    /// [`Self::assign_driver`] and [`Self::mark_delivered`].
    pub fn update_status(
        &self,
        id: Uuid,
        actor: &Actor,
        requested: &str,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        let requested: OrderStatus = requested.parse()?;
        let note = note.unwrap_or_default();
        self.commit(id, &|current| {
            self.require_vendor_staff(current, actor, "update the status")?;
            let t = lifecycle::transition(current.status, requested, actor, &note, Utc::now())?;
            Ok(StagedChange {
                mutation: OrderMutation {
                    status: Some(t.to),
                    history: vec![t.entry],
                    ..Default::default()
                },
                event: status_event(current.id, t.to.as_str()),
            })
        })
    }

    // ── Appends ──────────────────────────────────────────────────────────────

    pub fn add_note(&self, id: Uuid, actor: &Actor, text: &str) -> Result<Order, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::invalid("text", "Note text is required"));
        }
        self.commit(id, &|current| {
            if !self.is_party_to(current, actor)? {
                return Err(DomainError::forbidden("Not a party to this order"));
            }
            let note = Note {
                text: text.to_string(),
                by: actor.label(),
                at: Utc::now(),
            };
            Ok(StagedChange {
                event: DomainEvent::new(EventKind::OrderNoteAdded, current.id, json!({ "note": note })),
                mutation: OrderMutation {
                    notes: vec![note],
                    ..Default::default()
                },
            })
        })
    }

    fn check_proof_access(&self, order: &Order, actor: &Actor) -> Result<(), DomainError> {
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Driver => order.assigned_driver == Some(actor.user_id),
            Role::Vendor => self.is_vendor_of(order, actor)?,
            Role::Customer => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(DomainError::forbidden("Only the order's vendor, driver or an admin can upload proof"))
        }
    }

    /// Uploads first and appends the proof only once the image store has
    /// accepted it. A failed upload leaves the order untouched.
    pub async fn add_proof(&self, id: Uuid, actor: &Actor, upload: ProofUpload) -> Result<Order, DomainError> {
        if upload.bytes.is_empty() {
            return Err(DomainError::invalid("file", "No file uploaded"));
        }
        if !upload.content_type.starts_with("image/") {
            return Err(DomainError::invalid("file", "Proof must be an image"));
        }

        let svc = self.clone();
        let who = actor.clone();
        blocking(move || {
            let order = svc.load(id)?;
            svc.check_proof_access(&order, &who)
        })
        .await?;

        let url = self.images.upload(upload.bytes, &upload.content_type).await?;

        let svc = self.clone();
        let who = actor.clone();
        let proof_type = upload
            .proof_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROOF_TYPE.to_string());
        blocking(move || {
            svc.commit(id, &|current| {
                svc.check_proof_access(current, &who)?;
                let proof = Proof {
                    url: url.clone(),
                    proof_type: proof_type.clone(),
                    uploaded_by: who.user_id,
                    at: Utc::now(),
                };
                Ok(StagedChange {
                    event: DomainEvent::new(
                        EventKind::OrderProofUploaded,
                        current.id,
                        json!({ "proof": proof }),
                    ),
                    mutation: OrderMutation {
                        proofs: vec![proof],
                        ..Default::default()
                    },
                })
            })
        })
        .await
    }

    /// Replaces the item subtotal, keeping fees as charged and re-deriving the
    /// grand total.
    pub fn change_price(&self, id: Uuid, actor: &Actor, items_total: BigDecimal) -> Result<Order, DomainError> {
        self.commit(id, &|current| {
            self.require_vendor_staff(current, actor, "change the price")?;
            if current.status.is_terminal() {
                return Err(DomainError::invalid(
                    "items_total",
                    format!("Cannot change the price of a {} order", current.status),
                ));
            }
            let charges = current.charges.with_items_total(&items_total)?;
            let entry = StatusHistoryEntry {
                status: format!(
                    "Price changed {} → {}",
                    current.charges.grand_total, charges.grand_total
                ),
                note: format!("Price updated by {}", actor.label()),
                by: actor.label(),
                at: Utc::now(),
            };
            Ok(StagedChange {
                event: DomainEvent::new(
                    EventKind::OrderUpdated,
                    current.id,
                    json!({ "total_amount": charges.grand_total.to_string() }),
                ),
                mutation: OrderMutation {
                    charges: Some(charges),
                    history: vec![entry],
                    ..Default::default()
                },
            })
        })
    }

    pub fn rate(&self, id: Uuid, actor: &Actor, rating: i16, review: Option<String>) -> Result<Order, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::invalid("rating", "Rating must be between 1 and 5"));
        }
        let review = review.unwrap_or_default();
        self.commit(id, &|current| {
            if current.customer_id != actor.user_id {
                return Err(DomainError::NotOwner);
            }
            if current.status != OrderStatus::Delivered {
                return Err(DomainError::NotDelivered);
            }
            if current.customer_rating.is_some() {
                return Err(DomainError::AlreadyRated);
            }
            Ok(StagedChange {
                mutation: OrderMutation {
                    rating: Some(CustomerRating {
                        rating,
                        review: review.clone(),
                        rated_at: Utc::now(),
                    }),
                    ..Default::default()
                },
                event: DomainEvent::new(EventKind::OrderRated, current.id, json!({ "rating": rating })),
            })
        })
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn invoice(&self, id: Uuid, actor: &Actor) -> Result<Vec<u8>, DomainError> {
        let order = self.load(id)?;
        if order.customer_id != actor.user_id {
            return Err(DomainError::forbidden("Only the customer can download this invoice"));
        }
        if order.status != OrderStatus::Delivered {
            return Err(DomainError::InvoiceNotReady);
        }
        render_invoice(&order)
    }

    pub fn get(&self, id: Uuid, actor: &Actor) -> Result<Order, DomainError> {
        let order = self.load(id)?;
        if !self.can_view(&order, actor)? {
            return Err(DomainError::forbidden("Not a party to this order"));
        }
        Ok(order)
    }

    pub fn list(&self, actor: &Actor, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        actor.require(Role::Admin, "list all orders")?;
        self.orders.list(page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
    }

    pub fn my_orders(&self, actor: &Actor) -> Result<Vec<Order>, DomainError> {
        actor.require(Role::Customer, "list their orders")?;
        self.orders.find(OrderFilter::Customer(actor.user_id))
    }

    /// Orders with at least one item from `vendor_id`, including legacy
    /// orders attributed only through the product.
    fn orders_of_vendor(&self, vendor_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let mut orders = self.orders.find(OrderFilter::ItemVendor(vendor_id))?;
        let mut seen: HashSet<Uuid> = orders.iter().map(|o| o.id).collect();
        for legacy in self.orders.find(OrderFilter::UnattributedItems)? {
            if !seen.contains(&legacy.id) && vendor_ids(&legacy, self.catalog.as_ref())?.contains(&vendor_id) {
                seen.insert(legacy.id);
                orders.push(legacy);
            }
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub fn vendor_orders(&self, actor: &Actor, vendor_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let own_store = actor.is(Role::Vendor) && actor.user_id == vendor_id;
        if !own_store && !actor.is(Role::Admin) {
            return Err(DomainError::forbidden("Vendors can only list their own orders"));
        }
        self.orders_of_vendor(vendor_id)
    }

    pub fn available_for_pickup(&self, actor: &Actor) -> Result<Vec<Order>, DomainError> {
        actor.require(Role::Driver, "view available orders")?;
        self.orders.find(OrderFilter::AwaitingDriver)
    }

    pub fn active_deliveries(&self, actor: &Actor) -> Result<Vec<Order>, DomainError> {
        actor.require(Role::Driver, "view active orders")?;
        self.orders.find(OrderFilter::Driver {
            driver_id: actor.user_id,
            status: Some(OrderStatus::OutForDelivery),
        })
    }

    pub fn driver_stats(&self, actor: &Actor) -> Result<DriverStats, DomainError> {
        actor.require(Role::Driver, "view driver stats")?;
        let delivered = self.orders.find(OrderFilter::Driver {
            driver_id: actor.user_id,
            status: Some(OrderStatus::Delivered),
        })?;
        let active = self.active_deliveries(actor)?;

        let total_earnings = delivered
            .iter()
            .fold(BigDecimal::from(0), |acc, o| acc + &o.charges.delivery_charge);
        let ratings: Vec<i16> = delivered
            .iter()
            .filter_map(|o| o.customer_rating.as_ref().map(|r| r.rating))
            .collect();

        Ok(DriverStats {
            total_deliveries: delivered.len(),
            total_earnings,
            average_rating: mean_rating(&ratings),
            active_deliveries: active.len(),
        })
    }

    pub fn vendor_rating_summary(&self, vendor_id: Uuid) -> Result<RatingSummary, DomainError> {
        Ok(summarize(&self.orders_of_vendor(vendor_id)?))
    }

    pub fn product_rating_summary(&self, product_id: Uuid) -> Result<RatingSummary, DomainError> {
        Ok(summarize(&self.orders.find(OrderFilter::Product(product_id))?))
    }
}
