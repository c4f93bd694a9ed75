use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::events::Channel;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeMessage {
    pub event: String,
    pub data: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("nobody is listening on {0}")]
    NoSubscribers(String),
}

pub trait RealtimeTransport: Send + Sync + 'static {
    /// Subscribes to a room, creating it on first use.
    fn join(&self, channel: Channel) -> broadcast::Receiver<RealtimeMessage>;
    /// Sends to every current member of the room and returns how many
    /// received it.
    fn emit(&self, channel: Channel, event: &str, payload: Value) -> Result<usize, TransportError>;
}

pub struct RealtimeHub {
    rooms: Mutex<HashMap<Channel, broadcast::Sender<RealtimeMessage>>>,
    capacity: usize,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RealtimeHub {
    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// missing messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<Channel, broadcast::Sender<RealtimeMessage>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.rooms()
            .get(&channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl RealtimeTransport for RealtimeHub {
    fn join(&self, channel: Channel) -> broadcast::Receiver<RealtimeMessage> {
        let mut rooms = self.rooms();
        match rooms.get(&channel) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                rooms.insert(channel, sender);
                debug!("Opened room {channel}");
                receiver
            }
        }
    }

    fn emit(&self, channel: Channel, event: &str, payload: Value) -> Result<usize, TransportError> {
        let mut rooms = self.rooms();
        let Some(sender) = rooms.get(&channel) else {
            return Err(TransportError::NoSubscribers(channel.to_string()));
        };
        let message = RealtimeMessage {
            event: event.to_string(),
            data: payload,
        };
        match sender.send(message) {
            Ok(delivered) => Ok(delivered),
            Err(_) => {
                rooms.remove(&channel);
                debug!("Closed empty room {channel}");
                Err(TransportError::NoSubscribers(channel.to_string()))
            }
        }
    }
}
