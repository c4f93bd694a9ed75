use std::sync::Arc;

use dotenvy::dotenv;
use grabbie_orders::application::cart_service::CartService;
use grabbie_orders::application::order_service::OrderService;
use grabbie_orders::application::payment_service::PaymentService;
use grabbie_orders::application::settings_service::SettingsService;
use grabbie_orders::config::ServerConfig;
use grabbie_orders::infrastructure::cart_repo::DieselCartRepository;
use grabbie_orders::infrastructure::catalog_repo::DieselCatalogRepository;
use grabbie_orders::infrastructure::image_store::HttpImageStore;
use grabbie_orders::infrastructure::order_repo::DieselOrderRepository;
use grabbie_orders::infrastructure::payment_repo::DieselPaymentRepository;
use grabbie_orders::infrastructure::settings_repo::DieselSettingsRepository;
use grabbie_orders::payment::{PaymentVerifier, RazorpayGateway};
use grabbie_orders::realtime::{spawn_notifier, EventBus, RealtimeHub};
use grabbie_orders::{build_server, create_pool, run_migrations, AppState, AuthConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ServerConfig::from_env().expect("Invalid configuration");

    let pool = create_pool(&config.database_url, config.db_pool_size).expect("Failed to create DB pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
    let catalog = Arc::new(DieselCatalogRepository::new(pool.clone()));
    let carts = Arc::new(DieselCartRepository::new(pool.clone()));
    let settings = SettingsService::new(
        Arc::new(DieselSettingsRepository::new(pool.clone())),
        config.default_delivery_charge.clone(),
    );
    let payments = PaymentService::new(
        Arc::new(RazorpayGateway::new(config.payment.clone())),
        Arc::new(DieselPaymentRepository::new(pool)),
        PaymentVerifier::new(config.payment.key_secret.clone()),
    );

    let hub = Arc::new(RealtimeHub::default());
    let (bus, events) = EventBus::new();
    spawn_notifier(events, orders.clone(), catalog.clone(), hub.clone());

    let state = AppState {
        orders: OrderService::new(
            orders,
            catalog.clone(),
            carts.clone(),
            settings.clone(),
            Arc::new(HttpImageStore::new(config.image.clone())),
            payments.clone(),
            bus,
        ),
        carts: CartService::new(carts, catalog),
        settings,
        payments,
        payment_key_id: config.payment.key_id.clone(),
        realtime: hub,
    };

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, AuthConfig::new(config.auth_token_secret), &config.host, config.port)?.await
}
