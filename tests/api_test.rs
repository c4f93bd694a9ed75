//! HTTP-level tests against the in-memory store. No external services needed.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use grabbie_orders::application::cart_service::CartService;
use grabbie_orders::application::order_service::OrderService;
use grabbie_orders::application::payment_service::PaymentService;
use grabbie_orders::application::settings_service::SettingsService;
use grabbie_orders::auth::{issue_token, Claims};
use grabbie_orders::domain::actor::Role;
use grabbie_orders::domain::catalog::{Product, UserProfile};
use grabbie_orders::domain::errors::DomainError;
use grabbie_orders::domain::ports::{GatewayOrder, ImageStore, PaymentGateway};
use grabbie_orders::infrastructure::memory::InMemoryStore;
use grabbie_orders::payment::PaymentVerifier;
use grabbie_orders::realtime::{EventBus, RealtimeHub};
use grabbie_orders::{configure_routes, AppState, AuthConfig};

const SECRET: &str = "test-token-secret";
const PAYMENT_SECRET: &str = "rzp_test_secret";

struct StaticImages;

#[async_trait]
impl ImageStore for StaticImages {
    async fn upload(&self, _bytes: Vec<u8>, _content_type: &str) -> Result<String, DomainError> {
        Ok("https://cdn.test/proof.png".to_string())
    }
}

/// Numbers gateway orders `order_stub_1`, `order_stub_2`, ...
#[derive(Default)]
struct StubGateway {
    opened: AtomicU32,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(&self, amount_minor: i64, receipt: &str) -> Result<GatewayOrder, DomainError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_stub_{n}"),
            amount: amount_minor,
            currency: "INR".to_string(),
            receipt: Some(receipt.to_string()),
        })
    }
}

struct User {
    id: Uuid,
    token: String,
}

fn user(role: Role, name: &str) -> User {
    let id = Uuid::new_v4();
    let claims = Claims {
        user_id: id,
        name: name.to_string(),
        role,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    User {
        id,
        token: issue_token(SECRET, &claims).unwrap(),
    }
}

fn bearer(user: &User) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", user.token))
}

struct World {
    state: AppState,
    vendor: User,
    customer: User,
    thali: Uuid,
    lassi: Uuid,
}

fn world() -> World {
    let store = Arc::new(InMemoryStore::new());
    let vendor = user(Role::Vendor, "Annapurna Foods");
    let customer = user(Role::Customer, "Asha");
    store
        .add_user(UserProfile {
            id: vendor.id,
            name: "Annapurna Foods".to_string(),
            email: "shop@annapurna.test".to_string(),
            role: Role::Vendor,
            business_name: Some("Annapurna Foods".to_string()),
            business_address: Some("MG Road, Pune".to_string()),
            business_phone: Some("020-5550101".to_string()),
        })
        .unwrap();
    let (thali, lassi) = (Uuid::new_v4(), Uuid::new_v4());
    for (id, name, price) in [(thali, "Thali", 100), (lassi, "Lassi", 50)] {
        store
            .add_product(Product {
                id,
                name: name.to_string(),
                price: BigDecimal::from(price),
                vendor_id: Some(vendor.id),
            })
            .unwrap();
    }

    let settings = SettingsService::new(store.clone(), BigDecimal::from(30));
    let payments = PaymentService::new(
        Arc::new(StubGateway::default()),
        store.clone(),
        PaymentVerifier::new(PAYMENT_SECRET),
    );
    // The receiver is dropped: events are published into the void, which
    // must never affect the request.
    let (bus, _) = EventBus::new();
    let state = AppState {
        orders: OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            settings.clone(),
            Arc::new(StaticImages),
            payments.clone(),
            bus,
        ),
        carts: CartService::new(store.clone(), store),
        settings,
        payments,
        payment_key_id: "rzp_test_key".to_string(),
        realtime: Arc::new(RealtimeHub::default()),
    };
    World {
        state,
        vendor,
        customer,
        thali,
        lassi,
    }
}

macro_rules! app {
    ($world:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($world.state.clone()))
                .app_data(web::Data::new(AuthConfig::new(SECRET)))
                .configure(configure_routes),
        )
        .await
    };
}

fn order_body(w: &World) -> Value {
    json!({
        "items": [
            { "product_id": w.thali, "quantity": 2 },
            { "product_id": w.lassi, "quantity": 1 }
        ],
        "delivery_details": {
            "full_name": "Asha Rao",
            "phone": "9000000000",
            "address_line1": "12 MG Road",
            "city": "Pune",
            "state": "MH",
            "postal_code": "411001"
        },
        "payment_method": "cod"
    })
}

fn decimal(v: &Value) -> BigDecimal {
    BigDecimal::from_str(v.as_str().expect("decimal serialized as string")).unwrap()
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let w = world();
    let app = app!(w);

    let req = test::TestRequest::get().uri("/orders/my-orders").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn placing_an_order_computes_charges_server_side() {
    let w = world();
    let app = app!(w);

    let req = test::TestRequest::post()
        .uri("/orders/place")
        .insert_header(bearer(&w.customer))
        .set_json(order_body(&w))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;

    assert_eq!(order["status"], "Placed");
    assert_eq!(decimal(&order["charges"]["items_total"]), BigDecimal::from(250));
    assert_eq!(
        decimal(&order["charges"]["grand_total"]),
        BigDecimal::from_str("310.63").unwrap()
    );
    assert_eq!(order["total_amount"], order["charges"]["grand_total"]);
    assert_eq!(order["status_history"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn online_payment_with_a_bad_signature_is_refused() {
    let w = world();
    let app = app!(w);
    let mut body = order_body(&w);
    body["payment_method"] = json!("online");
    body["payment"] = json!({
        "razorpay_order_id": "order_1",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": "00ff"
    });

    let req = test::TestRequest::post()
        .uri("/orders/place")
        .insert_header(bearer(&w.customer))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
}

/// Places the standard two-item order as the world's customer and yields its id.
macro_rules! place {
    ($app:expr, $world:expr) => {{
        let req = test::TestRequest::post()
            .uri("/orders/place")
            .insert_header(bearer(&$world.customer))
            .set_json(order_body(&$world))
            .to_request();
        let order: Value = test::call_and_read_body_json(&$app, req).await;
        Uuid::parse_str(order["id"].as_str().unwrap()).unwrap()
    }};
}

#[actix_web::test]
async fn full_delivery_flow_ends_with_an_invoice() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);
    let driver = user(Role::Driver, "Ravi");

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{id}/invoice"))
        .insert_header(bearer(&w.customer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "Invoice available after delivery");

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/status"))
        .insert_header(bearer(&w.vendor))
        .set_json(json!({ "status": "Ready for Pickup" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/orders/available")
        .insert_header(bearer(&driver))
        .to_request();
    let available: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(available.as_array().unwrap().len(), 1);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/assign"))
        .insert_header(bearer(&driver))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/deliver"))
        .insert_header(bearer(&driver))
        .to_request();
    let delivered: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(delivered["status"], "Delivered");

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{id}/invoice"))
        .insert_header(bearer(&w.customer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "application/pdf"
    );
    let pdf = test::read_body(resp).await;
    assert!(pdf.starts_with(b"%PDF"));

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{id}/rate"))
        .insert_header(bearer(&w.customer))
        .set_json(json!({ "rating": 5, "review": "Still hot" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{id}/rate"))
        .insert_header(bearer(&w.customer))
        .set_json(json!({ "rating": 1 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri("/orders/driver/stats")
        .insert_header(bearer(&driver))
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["total_deliveries"], 1);
    assert_eq!(stats["average_rating"], 5.0);
}

#[actix_web::test]
async fn second_driver_claim_conflicts() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/status"))
        .insert_header(bearer(&w.vendor))
        .set_json(json!({ "status": "Ready for Pickup" }))
        .to_request();
    test::call_service(&app, req).await;

    let (first, second) = (user(Role::Driver, "D1"), user(Role::Driver, "D2"));
    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/assign"))
        .insert_header(bearer(&first))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/assign"))
        .insert_header(bearer(&second))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn unknown_status_names_the_offending_field() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/status"))
        .insert_header(bearer(&w.vendor))
        .set_json(json!({ "status": "Shipped" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["field"], "status");
}

#[actix_web::test]
async fn vendor_rejection_is_audited() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/vendor-reject"))
        .insert_header(bearer(&w.vendor))
        .set_json(json!({ "reason": "Out of stock" }))
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(order["status"], "Cancelled");
    assert_eq!(order["status_history"][1]["status"], "Rejected by Vendor");
}

#[actix_web::test]
async fn proof_uploads_must_be_images() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{id}/proof?type=pickup"))
        .insert_header(bearer(&w.vendor))
        .insert_header(("Content-Type", "text/plain"))
        .set_payload("not an image")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{id}/proof?type=pickup"))
        .insert_header(bearer(&w.vendor))
        .insert_header(("Content-Type", "image/png"))
        .set_payload(vec![0x89, b'P', b'N', b'G'])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;
    assert_eq!(order["proofs"][0]["proof_type"], "pickup");
    assert_eq!(order["proofs"][0]["url"], "https://cdn.test/proof.png");
}

#[actix_web::test]
async fn cart_accumulates_and_clears() {
    let w = world();
    let app = app!(w);

    for qty in [1, 2] {
        let req = test::TestRequest::post()
            .uri("/cart/add")
            .insert_header(bearer(&w.customer))
            .set_json(json!({ "product_id": w.thali, "quantity": qty }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
    let req = test::TestRequest::get()
        .uri("/cart")
        .insert_header(bearer(&w.customer))
        .to_request();
    let cart: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cart["items"][0]["quantity"], 3);

    place!(app, w);
    let req = test::TestRequest::get()
        .uri("/cart")
        .insert_header(bearer(&w.customer))
        .to_request();
    let cart: Value = test::call_and_read_body_json(&app, req).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn only_admins_change_the_delivery_charge() {
    let w = world();
    let app = app!(w);
    let admin = user(Role::Admin, "Ops");

    let req = test::TestRequest::put()
        .uri("/settings/delivery-charge")
        .insert_header(bearer(&w.vendor))
        .set_json(json!({ "delivery_charge": "45" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri("/settings/delivery-charge")
        .insert_header(bearer(&admin))
        .set_json(json!({ "delivery_charge": "45" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let id = place!(app, w);
    let req = test::TestRequest::get()
        .uri(&format!("/orders/{id}"))
        .insert_header(bearer(&w.customer))
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(decimal(&order["charges"]["delivery_charge"]), BigDecimal::from(45));
}

#[actix_web::test]
async fn payment_endpoints_use_the_gateway_and_verify_signatures() {
    let w = world();
    let app = app!(w);

    let req = test::TestRequest::post()
        .uri("/payment/create-order")
        .insert_header(bearer(&w.customer))
        .set_json(json!({ "amount": "310.63" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["amount"], 31063);
    assert_eq!(created["key_id"], "rzp_test_key");

    let good = PaymentVerifier::new(PAYMENT_SECRET).sign("order_stub_1", "pay_9").unwrap();
    let req = test::TestRequest::post()
        .uri("/payment/verify")
        .insert_header(bearer(&w.customer))
        .set_json(json!({
            "razorpay_order_id": "order_stub_1",
            "razorpay_payment_id": "pay_9",
            "razorpay_signature": good
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/payment/verify")
        .insert_header(bearer(&w.customer))
        .set_json(json!({
            "gateway_order_id": "order_stub_1",
            "payment_id": "pay_9",
            "signature": "not-hex"
        }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::PAYMENT_REQUIRED
    );
}

/// Opens a gateway order for `$amount` as the world's customer and returns
/// the signed confirmation a checkout widget would hand back.
macro_rules! pay {
    ($app:expr, $world:expr, $amount:expr, $payment_id:expr) => {{
        let req = test::TestRequest::post()
            .uri("/payment/create-order")
            .insert_header(bearer(&$world.customer))
            .set_json(json!({ "amount": $amount }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&$app, req).await;
        let gateway_order_id = created["id"].as_str().unwrap().to_string();
        let signature = PaymentVerifier::new(PAYMENT_SECRET)
            .sign(&gateway_order_id, $payment_id)
            .unwrap();
        json!({
            "razorpay_order_id": gateway_order_id,
            "razorpay_payment_id": $payment_id,
            "razorpay_signature": signature
        })
    }};
}

fn online_body(w: &World, payment: Value) -> Value {
    let mut body = order_body(w);
    body["payment_method"] = json!("online");
    body["payment"] = payment;
    body
}

#[actix_web::test]
async fn one_online_payment_settles_one_order() {
    let w = world();
    let app = app!(w);
    let payment = pay!(app, w, "310.63", "pay_1");

    let req = test::TestRequest::post()
        .uri("/orders/place")
        .insert_header(bearer(&w.customer))
        .set_json(online_body(&w, payment.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;
    assert_eq!(order["payment"]["payment_id"], "pay_1");

    let req = test::TestRequest::post()
        .uri("/orders/place")
        .insert_header(bearer(&w.customer))
        .set_json(online_body(&w, payment))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri("/orders/my-orders")
        .insert_header(bearer(&w.customer))
        .to_request();
    let mine: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn online_payment_must_cover_the_order_total() {
    let w = world();
    let app = app!(w);
    let payment = pay!(app, w, "1.00", "pay_1");

    let req = test::TestRequest::post()
        .uri("/orders/place")
        .insert_header(bearer(&w.customer))
        .set_json(online_body(&w, payment))
        .to_request();

    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::PAYMENT_REQUIRED
    );
}

#[actix_web::test]
async fn status_endpoint_cannot_skip_to_delivered() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);

    let req = test::TestRequest::put()
        .uri(&format!("/orders/{id}/status"))
        .insert_header(bearer(&w.vendor))
        .set_json(json!({ "status": "Delivered" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "Cannot move order from 'Placed' to 'Delivered'");
}

#[actix_web::test]
async fn strangers_cannot_read_an_order() {
    let w = world();
    let app = app!(w);
    let id = place!(app, w);
    let stranger = user(Role::Customer, "Eve");

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{id}"))
        .insert_header(bearer(&stranger))
        .to_request();

    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}
