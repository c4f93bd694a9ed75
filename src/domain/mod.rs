pub mod actor;
pub mod catalog;
pub mod charges;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod order;
pub mod payment;
pub mod ports;
