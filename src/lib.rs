pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod invoice;
pub mod payment;
pub mod realtime;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use auth::AuthConfig;
pub use db::{create_pool, DbPool};
pub use handlers::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Largest accepted request body. Proof images are sent raw.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::my_orders,
        handlers::orders::available_orders,
        handlers::orders::active_orders,
        handlers::orders::driver_stats,
        handlers::orders::vendor_orders,
        handlers::orders::vendor_ratings,
        handlers::orders::product_ratings,
        handlers::orders::assign_driver,
        handlers::orders::mark_delivered,
        handlers::orders::cancel_order,
        handlers::orders::vendor_reject,
        handlers::orders::update_status,
        handlers::orders::change_price,
        handlers::orders::add_note,
        handlers::orders::add_proof,
        handlers::orders::rate_order,
        handlers::orders::download_invoice,
        handlers::cart::get_cart,
        handlers::cart::add_to_cart,
        handlers::cart::remove_from_cart,
        handlers::cart::clear_cart,
        handlers::settings::get_delivery_charge,
        handlers::settings::set_delivery_charge,
        handlers::payment::create_payment,
        handlers::payment::verify_payment,
        handlers::realtime::subscribe,
    ),
    tags(
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "drivers", description = "Pickup, delivery and driver earnings"),
        (name = "vendors", description = "Vendor fulfilment"),
        (name = "cart", description = "Customer cart"),
        (name = "settings", description = "Runtime settings"),
        (name = "payment", description = "Payment gateway bridge"),
        (name = "realtime", description = "Server-sent order events"),
    )
)]
pub struct ApiDoc;

/// Registers every API route. Static `/orders/...` segments come before
/// `/orders/{id}` so they are not swallowed by the id matcher.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    use handlers::{cart, orders, payment, realtime, settings};

    cfg.service(
        web::scope("/orders")
            .route("", web::get().to(orders::list_orders))
            .route("/place", web::post().to(orders::place_order))
            .route("/my-orders", web::get().to(orders::my_orders))
            .route("/available", web::get().to(orders::available_orders))
            .route("/active", web::get().to(orders::active_orders))
            .route("/driver/stats", web::get().to(orders::driver_stats))
            .route("/vendor/{vendor_id}", web::get().to(orders::vendor_orders))
            .route("/vendor/{vendor_id}/ratings", web::get().to(orders::vendor_ratings))
            .route(
                "/product/{product_id}/ratings-summary",
                web::get().to(orders::product_ratings),
            )
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/assign", web::put().to(orders::assign_driver))
            .route("/{id}/deliver", web::put().to(orders::mark_delivered))
            .route("/{id}/cancel", web::put().to(orders::cancel_order))
            .route("/{id}/vendor-reject", web::put().to(orders::vendor_reject))
            .route("/{id}/status", web::put().to(orders::update_status))
            .route("/{id}/price", web::put().to(orders::change_price))
            .route("/{id}/notes", web::post().to(orders::add_note))
            .route("/{id}/proof", web::post().to(orders::add_proof))
            .route("/{id}/rate", web::post().to(orders::rate_order))
            .route("/{id}/invoice", web::get().to(orders::download_invoice)),
    )
    .service(
        web::scope("/cart")
            .route("", web::get().to(cart::get_cart))
            .route("", web::delete().to(cart::clear_cart))
            .route("/add", web::post().to(cart::add_to_cart))
            .route("/remove", web::post().to(cart::remove_from_cart)),
    )
    .service(
        web::scope("/settings")
            .route("/delivery-charge", web::get().to(settings::get_delivery_charge))
            .route("/delivery-charge", web::put().to(settings::set_delivery_charge)),
    )
    .service(
        web::scope("/payment")
            .route("/create-order", web::post().to(payment::create_payment))
            .route("/verify", web::post().to(payment::verify_payment)),
    )
    .route("/realtime/subscribe", web::get().to(realtime::subscribe));
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    auth: AuthConfig,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let auth = web::Data::new(auth);
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(auth.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
            .wrap(Logger::default())
            .configure(configure_routes)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind((host.to_string(), port))?
    .run())
}
