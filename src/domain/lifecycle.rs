//! Order status state machine.
//!
//! Every status change in the service is decided here. Callers ask for a
//! `(current, requested, actor)` triple and get back either the history entry
//! to append or the reason the change is illegal.

use chrono::{DateTime, Utc};

use super::actor::{Actor, Role};
use super::errors::DomainError;
use super::order::{OrderStatus, StatusHistoryEntry};

pub const VENDOR_REJECTED_LABEL: &str = "Rejected by Vendor";

const VENDOR_STAFF: &[Role] = &[Role::Vendor, Role::Admin];
const PLACED_CANCELLERS: &[Role] = &[Role::Vendor, Role::Customer, Role::Admin];
const CANCELLERS: &[Role] = &[Role::Customer, Role::Admin];
const DRIVER: &[Role] = &[Role::Driver];

/// Roles allowed to move an order along `from -> to`. Empty when the edge
/// does not exist.
pub fn allowed_roles(from: OrderStatus, to: OrderStatus) -> &'static [Role] {
    use OrderStatus::*;

    match (from, to) {
        (Placed, Accepted | Preparing | ReadyForPickup) => VENDOR_STAFF,
        (Accepted, Preparing | ReadyForPickup) => VENDOR_STAFF,
        (Preparing, ReadyForPickup) => VENDOR_STAFF,
        (Placed, Cancelled) => PLACED_CANCELLERS,
        (Accepted | Preparing | ReadyForPickup | OutForDelivery, Cancelled) => CANCELLERS,
        (ReadyForPickup, OutForDelivery) => DRIVER,
        (OutForDelivery, Delivered) => DRIVER,
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub entry: StatusHistoryEntry,
}

pub fn transition(
    current: OrderStatus,
    requested: OrderStatus,
    actor: &Actor,
    note: &str,
    at: DateTime<Utc>,
) -> Result<Transition, DomainError> {
    let roles = allowed_roles(current, requested);
    if roles.is_empty() {
        return Err(DomainError::InvalidTransition {
            from: current,
            to: requested,
        });
    }
    if !roles.contains(&actor.role) {
        return Err(DomainError::forbidden(format!(
            "A {} cannot move an order from '{current}' to '{requested}'",
            actor.role
        )));
    }
    Ok(Transition {
        from: current,
        to: requested,
        entry: StatusHistoryEntry {
            status: requested.to_string(),
            note: note.to_string(),
            by: actor.label(),
            at,
        },
    })
}

/// Vendor rejection of a freshly placed order. Lands in `Cancelled` but is
/// audited under its own label.
pub fn vendor_reject(
    current: OrderStatus,
    actor: &Actor,
    note: &str,
    at: DateTime<Utc>,
) -> Result<Transition, DomainError> {
    actor.require(Role::Vendor, "reject an order")?;
    let mut t = transition(current, OrderStatus::Cancelled, actor, note, at)?;
    t.entry.status = VENDOR_REJECTED_LABEL.to_string();
    Ok(t)
}
