pub mod cart;
pub mod orders;
pub mod payment;
pub mod realtime;
pub mod settings;

use std::sync::Arc;

use crate::application::cart_service::CartService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::settings_service::SettingsService;
use crate::realtime::RealtimeTransport;

/// Shared by every worker. All members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub carts: CartService,
    pub settings: SettingsService,
    pub payments: PaymentService,
    /// Public key id handed to clients for the checkout widget.
    pub payment_key_id: String,
    pub realtime: Arc<dyn RealtimeTransport>,
}
