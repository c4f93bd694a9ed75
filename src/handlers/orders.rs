use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::AppState;
use crate::application::order_service::{
    DriverStats, ItemRequest, PlaceOrder, ProofUpload, RatingSummary,
};
use crate::application::payment_service::PaymentConfirmation;
use crate::auth::AuthenticatedUser;
use crate::domain::order::{DeliveryDetails, Order, PaymentMethod};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Identifiers returned by the checkout widget after an online payment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentProof {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub delivery_details: DeliveryDetails,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Decimal as a string, e.g. "20.00"
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub tip: Option<BigDecimal>,
    #[serde(default)]
    pub payment: Option<PaymentProof>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeliverRequest {
    #[schema(value_type = Option<String>)]
    pub delivery_charge: Option<BigDecimal>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    /// One of the display names, e.g. "Ready for Pickup"
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PriceRequest {
    #[schema(value_type = String)]
    pub items_total: BigDecimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RateRequest {
    pub rating: i16,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProofParams {
    #[serde(rename = "type")]
    pub proof_type: Option<String>,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers: placement and queries ──────────────────────────────────────────

/// POST /orders/place
///
/// Places an order for the authenticated customer. Prices, vendor details and
/// charges are fixed at this point; the customer's cart is emptied.
#[utoipa::path(
    post,
    path = "/orders/place",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = Order),
        (status = 400, description = "Invalid items or delivery details"),
        (status = 402, description = "Online payment could not be verified"),
        (status = 404, description = "Unknown product"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let input = PlaceOrder {
        items: body
            .items
            .into_iter()
            .map(|i| ItemRequest {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect(),
        delivery_details: body.delivery_details,
        payment_method: body.payment_method,
        tip: body.tip,
        payment: body.payment.map(|p| PaymentConfirmation {
            gateway_order_id: p.gateway_order_id,
            payment_id: p.payment_id,
            signature: p.signature,
        }),
    };

    let order = web::block(move || state.orders.place_order(&user.0, input)).await??;
    Ok(HttpResponse::Created().json(order))
}

/// GET /orders
///
/// Admin view of every order, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || state.orders.list(&user.0, page, limit)).await??;
    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items,
        total: result.total,
        page,
        limit,
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 403, description = "Caller is not a party to the order"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || state.orders.get(id, &user.0)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    get,
    path = "/orders/my-orders",
    responses((status = 200, description = "The caller's orders", body = [Order])),
    tag = "orders"
)]
pub async fn my_orders(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || state.orders.my_orders(&user.0)).await??;
    Ok(HttpResponse::Ok().json(orders))
}

/// GET /orders/available
///
/// Orders ready for pickup that no driver has claimed yet.
#[utoipa::path(
    get,
    path = "/orders/available",
    responses((status = 200, description = "Unclaimed orders", body = [Order])),
    tag = "drivers"
)]
pub async fn available_orders(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || state.orders.available_for_pickup(&user.0)).await??;
    Ok(HttpResponse::Ok().json(orders))
}

#[utoipa::path(
    get,
    path = "/orders/active",
    responses((status = 200, description = "The driver's deliveries in progress", body = [Order])),
    tag = "drivers"
)]
pub async fn active_orders(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || state.orders.active_deliveries(&user.0)).await??;
    Ok(HttpResponse::Ok().json(orders))
}

#[utoipa::path(
    get,
    path = "/orders/driver/stats",
    responses((status = 200, description = "Delivery count, earnings and rating", body = DriverStats)),
    tag = "drivers"
)]
pub async fn driver_stats(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let stats = web::block(move || state.orders.driver_stats(&user.0)).await??;
    Ok(HttpResponse::Ok().json(stats))
}

#[utoipa::path(
    get,
    path = "/orders/vendor/{vendor_id}",
    params(("vendor_id" = Uuid, Path, description = "Vendor user UUID")),
    responses(
        (status = 200, description = "Orders containing the vendor's items", body = [Order]),
        (status = 403, description = "Not this vendor or an admin"),
    ),
    tag = "vendors"
)]
pub async fn vendor_orders(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let vendor_id = path.into_inner();
    let orders = web::block(move || state.orders.vendor_orders(&user.0, vendor_id)).await??;
    Ok(HttpResponse::Ok().json(orders))
}

#[utoipa::path(
    get,
    path = "/orders/vendor/{vendor_id}/ratings",
    params(("vendor_id" = Uuid, Path, description = "Vendor user UUID")),
    responses((status = 200, description = "Average customer rating", body = RatingSummary)),
    tag = "vendors"
)]
pub async fn vendor_ratings(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let vendor_id = path.into_inner();
    let summary = web::block(move || state.orders.vendor_rating_summary(vendor_id)).await??;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/orders/product/{product_id}/ratings-summary",
    params(("product_id" = Uuid, Path, description = "Product UUID")),
    responses((status = 200, description = "Average rating of orders containing the product", body = RatingSummary)),
    tag = "orders"
)]
pub async fn product_ratings(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let summary = web::block(move || state.orders.product_rating_summary(product_id)).await??;
    Ok(HttpResponse::Ok().json(summary))
}

// ── Handlers: lifecycle ──────────────────────────────────────────────────────

/// PUT /orders/{id}/assign
///
/// Claims a ready order for the calling driver. Of several drivers claiming
/// at once, exactly one succeeds; the others get 409.
#[utoipa::path(
    put,
    path = "/orders/{id}/assign",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order claimed", body = Order),
        (status = 400, description = "Order is not ready for pickup"),
        (status = 409, description = "Already assigned to another driver"),
    ),
    tag = "drivers"
)]
pub async fn assign_driver(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || state.orders.assign_driver(id, &user.0)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/deliver",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body(content = DeliverRequest, description = "Optional delivery fee override"),
    responses(
        (status = 200, description = "Order delivered", body = Order),
        (status = 400, description = "Order is not out for delivery"),
        (status = 403, description = "Caller is not the assigned driver"),
    ),
    tag = "drivers"
)]
pub async fn mark_delivered(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: Option<web::Json<DeliverRequest>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let fee = body.and_then(|b| b.into_inner().delivery_charge);
    let order = web::block(move || state.orders.mark_delivered(id, &user.0, fee)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body(content = ReasonRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Order cancelled", body = Order),
        (status = 400, description = "Order already finished"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: Option<web::Json<ReasonRequest>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);
    let order = web::block(move || state.orders.cancel(id, &user.0, reason)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/vendor-reject",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body(content = ReasonRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Order rejected", body = Order),
        (status = 400, description = "Order is no longer freshly placed"),
    ),
    tag = "vendors"
)]
pub async fn vendor_reject(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: Option<web::Json<ReasonRequest>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);
    let order = web::block(move || state.orders.vendor_reject(id, &user.0, reason)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Order),
        (status = 400, description = "Unknown status or illegal transition"),
    ),
    tag = "vendors"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let order =
        web::block(move || state.orders.update_status(id, &user.0, &body.status, body.note)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/price",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = PriceRequest,
    responses((status = 200, description = "Price changed", body = Order)),
    tag = "vendors"
)]
pub async fn change_price(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<PriceRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let items_total = body.into_inner().items_total;
    let order = web::block(move || state.orders.change_price(id, &user.0, items_total)).await??;
    Ok(HttpResponse::Ok().json(order))
}

// ── Handlers: notes, proofs, ratings, invoices ───────────────────────────────

#[utoipa::path(
    post,
    path = "/orders/{id}/notes",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = NoteRequest,
    responses((status = 201, description = "Note added", body = Order)),
    tag = "orders"
)]
pub async fn add_note(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<NoteRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let text = body.into_inner().text;
    let order = web::block(move || state.orders.add_note(id, &user.0, &text)).await??;
    Ok(HttpResponse::Created().json(order))
}

/// POST /orders/{id}/proof?type=delivery
///
/// The request body is the raw image; its `Content-Type` must be `image/*`.
#[utoipa::path(
    post,
    path = "/orders/{id}/proof",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("type" = Option<String>, Query, description = "Proof kind, default \"delivery\""),
    ),
    request_body(content = Vec<u8>, content_type = "image/*"),
    responses(
        (status = 201, description = "Proof stored", body = Order),
        (status = 502, description = "Image host rejected the upload"),
    ),
    tag = "orders"
)]
pub async fn add_proof(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<ProofParams>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let upload = ProofUpload {
        proof_type: query.into_inner().proof_type,
        content_type,
        bytes: body.to_vec(),
    };
    let order = state.orders.add_proof(path.into_inner(), &user.0, upload).await?;
    Ok(HttpResponse::Created().json(order))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/rate",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = RateRequest,
    responses(
        (status = 200, description = "Rating stored", body = Order),
        (status = 400, description = "Order not delivered or rating out of range"),
        (status = 409, description = "Order already rated"),
    ),
    tag = "orders"
)]
pub async fn rate_order(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<RateRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let order = web::block(move || state.orders.rate(id, &user.0, body.rating, body.review)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    get,
    path = "/orders/{id}/invoice",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Invoice PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Invoice available after delivery"),
        (status = 403, description = "Caller did not place the order"),
    ),
    tag = "orders"
)]
pub async fn download_invoice(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let pdf = web::block(move || state.orders.invoice(id, &user.0)).await??;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"invoice-{id}.pdf\""),
        ))
        .body(pdf))
}
