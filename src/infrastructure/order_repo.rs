use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::charges::Charges;
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::payment::PaymentReference;
use crate::domain::order::{
    CustomerRating, DeliveryDetails, ListResult, NewOrder, Note, Order, OrderFilter, OrderItem,
    OrderMutation, OrderStatus, Proof, StatusHistoryEntry, VendorSnapshot,
};
use crate::domain::ports::{ChangeFn, Committed, OrderRepository};
use crate::schema::{
    order_items, order_notes, order_outbox, order_proofs, order_status_history, orders,
};

use super::models::{
    NewNoteRow, NewOrderItemRow, NewOrderRow, NewOutboxEventRow, NewProofRow,
    NewStatusHistoryRow, NoteRow, OrderChangeset, OrderItemRow, OrderRow, ProofRow,
    StatusHistoryRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            e => DomainError::Internal(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::Internal(format!("stored {what} is unreadable: {e}"))
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn item_from_row(row: OrderItemRow) -> Result<OrderItem, DomainError> {
    let vendor_snapshot = row
        .vendor_snapshot
        .map(serde_json::from_value::<VendorSnapshot>)
        .transpose()
        .map_err(|e| corrupt("vendor snapshot", e))?;
    Ok(OrderItem {
        product_id: row.product_id,
        product_name: row.product_name,
        unit_price: row.unit_price,
        quantity: row.quantity,
        vendor_id: row.vendor_id,
        vendor_snapshot,
    })
}

fn order_from_rows(
    row: OrderRow,
    items: Vec<OrderItemRow>,
    history: Vec<StatusHistoryRow>,
    notes: Vec<NoteRow>,
    proofs: Vec<ProofRow>,
) -> Result<Order, DomainError> {
    let status: OrderStatus = row.status.parse().map_err(|e| corrupt("status", e))?;
    let payment_method = row
        .payment_method
        .parse()
        .map_err(|e| corrupt("payment method", e))?;
    let delivery_details: DeliveryDetails =
        serde_json::from_value(row.delivery_details).map_err(|e| corrupt("delivery details", e))?;

    let payment = match (row.payment_gateway_order_id, row.payment_id) {
        (Some(gateway_order_id), Some(payment_id)) => Some(PaymentReference {
            gateway_order_id,
            payment_id,
        }),
        _ => None,
    };

    let customer_rating = match (row.rating, row.rated_at) {
        (Some(rating), Some(rated_at)) => Some(CustomerRating {
            rating,
            review: row.review.unwrap_or_default(),
            rated_at,
        }),
        _ => None,
    };

    Ok(Order {
        id: row.id,
        customer_id: row.customer_id,
        items: items
            .into_iter()
            .map(item_from_row)
            .collect::<Result<_, _>>()?,
        charges: Charges {
            items_total: row.items_total,
            service_charge: row.service_charge,
            gst: row.gst,
            platform_fee: row.platform_fee,
            delivery_charge: row.delivery_charge,
            tip: row.tip,
            grand_total: row.grand_total,
        },
        payment_method,
        payment,
        delivery_details,
        status,
        assigned_driver: row.assigned_driver_id,
        status_history: history
            .into_iter()
            .map(|h| StatusHistoryEntry {
                status: h.status,
                note: h.note,
                by: h.by_actor,
                at: h.at,
            })
            .collect(),
        notes: notes
            .into_iter()
            .map(|n| Note {
                text: n.text,
                by: n.by_actor,
                at: n.at,
            })
            .collect(),
        proofs: proofs
            .into_iter()
            .map(|p| Proof {
                url: p.url,
                proof_type: p.proof_type,
                uploaded_by: p.uploaded_by,
                at: p.at,
            })
            .collect(),
        customer_rating,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Loads child rows for a page of orders in one query per table and stitches
/// them back together, preserving the order of `rows`.
fn hydrate(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let items = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?
        .grouped_by(&rows);
    let history = StatusHistoryRow::belonging_to(&rows)
        .select(StatusHistoryRow::as_select())
        .order(order_status_history::id.asc())
        .load(conn)?
        .grouped_by(&rows);
    let notes = NoteRow::belonging_to(&rows)
        .select(NoteRow::as_select())
        .order(order_notes::id.asc())
        .load(conn)?
        .grouped_by(&rows);
    let proofs = ProofRow::belonging_to(&rows)
        .select(ProofRow::as_select())
        .order(order_proofs::id.asc())
        .load(conn)?
        .grouped_by(&rows);

    rows.into_iter()
        .zip(items)
        .zip(history)
        .zip(notes)
        .zip(proofs)
        .map(|((((row, items), history), notes), proofs)| {
            order_from_rows(row, items, history, notes, proofs)
        })
        .collect()
}

fn load_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, DomainError> {
    let row = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;
    match row {
        Some(row) => Ok(hydrate(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

// ── Write helpers ────────────────────────────────────────────────────────────

fn write_outbox(conn: &mut PgConnection, event: &DomainEvent) -> Result<(), DomainError> {
    diesel::insert_into(order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: event.order_id.to_string(),
            event_type: event.kind.name().to_string(),
            payload: event.payload.clone(),
        })
        .execute(conn)?;
    Ok(())
}

fn append_history(
    conn: &mut PgConnection,
    order_id: Uuid,
    entries: &[StatusHistoryEntry],
) -> Result<(), DomainError> {
    if entries.is_empty() {
        return Ok(());
    }
    let rows: Vec<NewStatusHistoryRow> = entries
        .iter()
        .map(|e| NewStatusHistoryRow {
            order_id,
            status: e.status.clone(),
            note: e.note.clone(),
            by_actor: e.by.clone(),
            at: e.at,
        })
        .collect();
    diesel::insert_into(order_status_history::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

fn changeset(mutation: &OrderMutation, at: DateTime<Utc>) -> OrderChangeset {
    let charges = mutation.charges.as_ref();
    let rating = mutation.rating.as_ref();
    OrderChangeset {
        status: mutation.status.map(|s| s.as_str().to_string()),
        assigned_driver_id: mutation.assigned_driver,
        items_total: charges.map(|c| c.items_total.clone()),
        service_charge: charges.map(|c| c.service_charge.clone()),
        gst: charges.map(|c| c.gst.clone()),
        platform_fee: charges.map(|c| c.platform_fee.clone()),
        delivery_charge: charges.map(|c| c.delivery_charge.clone()),
        tip: charges.map(|c| c.tip.clone()),
        grand_total: charges.map(|c| c.grand_total.clone()),
        rating: rating.map(|r| r.rating),
        review: rating.map(|r| r.review.clone()),
        rated_at: rating.map(|r| r.rated_at),
        updated_at: Some(at),
    }
}

fn apply_mutation(
    conn: &mut PgConnection,
    order_id: Uuid,
    mutation: &OrderMutation,
    at: DateTime<Utc>,
) -> Result<(), DomainError> {
    diesel::update(orders::table.find(order_id))
        .set(&changeset(mutation, at))
        .execute(conn)?;

    append_history(conn, order_id, &mutation.history)?;

    if !mutation.notes.is_empty() {
        let rows: Vec<NewNoteRow> = mutation
            .notes
            .iter()
            .map(|n| NewNoteRow {
                order_id,
                text: n.text.clone(),
                by_actor: n.by.clone(),
                at: n.at,
            })
            .collect();
        diesel::insert_into(order_notes::table)
            .values(&rows)
            .execute(conn)?;
    }

    if !mutation.proofs.is_empty() {
        let rows: Vec<NewProofRow> = mutation
            .proofs
            .iter()
            .map(|p| NewProofRow {
                order_id,
                url: p.url.clone(),
                proof_type: p.proof_type.clone(),
                uploaded_by: p.uploaded_by,
                at: p.at,
            })
            .collect();
        diesel::insert_into(order_proofs::table)
            .values(&rows)
            .execute(conn)?;
    }

    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn insert(&self, order: NewOrder, event: &DomainEvent) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let delivery_details = serde_json::to_value(&order.delivery_details)
                .map_err(|e| DomainError::Internal(e.to_string()))?;
            let charges = &order.charges;
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    customer_id: order.customer_id,
                    status: OrderStatus::Placed.as_str().to_string(),
                    payment_method: order.payment_method.as_str().to_string(),
                    items_total: charges.items_total.clone(),
                    service_charge: charges.service_charge.clone(),
                    gst: charges.gst.clone(),
                    platform_fee: charges.platform_fee.clone(),
                    delivery_charge: charges.delivery_charge.clone(),
                    tip: charges.tip.clone(),
                    grand_total: charges.grand_total.clone(),
                    delivery_details,
                    created_at: order.placed_at,
                    updated_at: order.placed_at,
                    payment_gateway_order_id: order.payment.as_ref().map(|p| p.gateway_order_id.clone()),
                    payment_id: order.payment.as_ref().map(|p| p.payment_id.clone()),
                })
                .execute(conn)
                .map_err(|e| match DomainError::from(e) {
                    DomainError::Conflict(_) => DomainError::payment_reused(),
                    other => other,
                })?;

            let items = order
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| {
                    let vendor_snapshot = item
                        .vendor_snapshot
                        .as_ref()
                        .map(serde_json::to_value)
                        .transpose()
                        .map_err(|e| DomainError::Internal(e.to_string()))?;
                    Ok(NewOrderItemRow {
                        id: Uuid::new_v4(),
                        order_id: order.id,
                        position: position as i32,
                        product_id: item.product_id,
                        product_name: item.product_name.clone(),
                        unit_price: item.unit_price.clone(),
                        quantity: item.quantity,
                        vendor_id: item.vendor_id,
                        vendor_snapshot,
                    })
                })
                .collect::<Result<Vec<_>, DomainError>>()?;
            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            append_history(conn, order.id, &[order.opening_entry()])?;

            // Same transaction as the order itself, so the outbox never
            // announces an order that was rolled back.
            write_outbox(conn, event)?;

            load_order(conn, order.id)?.ok_or_else(DomainError::order_not_found)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, id)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = page.saturating_sub(1).max(0).saturating_mul(limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: hydrate(conn, rows)?,
                total,
            })
        })
    }

    fn find(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let query = orders::table
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .into_boxed();

        let query = match filter {
            OrderFilter::Customer(customer_id) => query.filter(orders::customer_id.eq(customer_id)),
            OrderFilter::ItemVendor(vendor_id) => query.filter(
                orders::id.eq_any(
                    order_items::table
                        .filter(order_items::vendor_id.eq(vendor_id))
                        .select(order_items::order_id),
                ),
            ),
            OrderFilter::UnattributedItems => query.filter(
                orders::id.eq_any(
                    order_items::table
                        .filter(order_items::vendor_id.is_null())
                        .select(order_items::order_id),
                ),
            ),
            OrderFilter::Product(product_id) => query.filter(
                orders::id.eq_any(
                    order_items::table
                        .filter(order_items::product_id.eq(product_id))
                        .select(order_items::order_id),
                ),
            ),
            OrderFilter::AwaitingDriver => query
                .filter(orders::status.eq(OrderStatus::ReadyForPickup.as_str()))
                .filter(orders::assigned_driver_id.is_null()),
            OrderFilter::Driver { driver_id, status } => {
                let query = query.filter(orders::assigned_driver_id.eq(driver_id));
                match status {
                    Some(status) => query.filter(orders::status.eq(status.as_str())),
                    None => query,
                }
            }
        };

        let rows = query.load(&mut conn)?;
        hydrate(&mut conn, rows)
    }

    fn mutate(&self, id: Uuid, change: &ChangeFn<'_>) -> Result<Committed, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Row lock held until commit: concurrent mutations of the same
            // order queue here and see each other's writes.
            let row = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(DomainError::order_not_found)?;
            let current = hydrate(conn, vec![row])?
                .pop()
                .ok_or_else(DomainError::order_not_found)?;

            let staged = change(&current)?;
            apply_mutation(conn, id, &staged.mutation, Utc::now())?;
            write_outbox(conn, &staged.event)?;

            let order = load_order(conn, id)?.ok_or_else(DomainError::order_not_found)?;
            Ok(Committed {
                order,
                event: staged.event,
            })
        })
    }
}
