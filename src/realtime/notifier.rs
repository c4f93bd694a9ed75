use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::hub::RealtimeTransport;
use crate::application::addressees::addressees;
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::ports::{CatalogRepository, OrderRepository};

/// Sending half of the domain-event bus. Publishing never blocks and never
/// fails the caller.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: DomainEvent) {
        let name = event.kind.name();
        let order_id = event.order_id;
        if self.tx.send(event).is_err() {
            warn!("Dropped {name} for order {order_id}: notifier is not running");
        }
    }
}

/// Merges the freshly loaded order into the event's own payload.
fn envelope(order: Value, payload: &Value) -> Value {
    let mut body = match payload {
        Value::Object(map) => Value::Object(map.clone()),
        Value::Null => json!({}),
        other => json!({ "data": other }),
    };
    body["order"] = order;
    body
}

/// Resolves the rooms for one event and emits to each. Returns how many
/// rooms accepted the message. Blocking: touches the repositories.
pub fn dispatch(
    event: &DomainEvent,
    orders: &dyn OrderRepository,
    catalog: &dyn CatalogRepository,
    transport: &dyn RealtimeTransport,
) -> Result<usize, DomainError> {
    let Some(order) = orders.find_by_id(event.order_id)? else {
        debug!("Order {} vanished before {} could be sent", event.order_id, event.kind.name());
        return Ok(0);
    };
    let rooms = addressees(&order, catalog)?;
    let order_json = serde_json::to_value(&order).map_err(|e| DomainError::Internal(e.to_string()))?;
    let body = envelope(order_json, &event.payload);

    let mut delivered = 0;
    for room in rooms {
        match transport.emit(room, event.kind.name(), body.clone()) {
            Ok(_) => delivered += 1,
            Err(e) => debug!("Skipped {}: {e}", event.kind.name()),
        }
    }
    Ok(delivered)
}

/// Runs until every [`EventBus`] handle is dropped.
pub fn spawn_notifier(
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
    transport: Arc<dyn RealtimeTransport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let orders = Arc::clone(&orders);
            let catalog = Arc::clone(&catalog);
            let transport = Arc::clone(&transport);
            let name = event.kind.name();
            let order_id = event.order_id;
            let result = tokio::task::spawn_blocking(move || {
                dispatch(&event, orders.as_ref(), catalog.as_ref(), transport.as_ref())
            })
            .await;
            match result {
                Ok(Ok(rooms)) => debug!("Sent {name} for order {order_id} to {rooms} room(s)"),
                Ok(Err(e)) => warn!("Could not send {name} for order {order_id}: {e}"),
                Err(e) => warn!("Notifier task for order {order_id} failed: {e}"),
            }
        }
        info!("Event bus closed; notifier stopped");
    })
}
