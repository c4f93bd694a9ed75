use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::AppState;
use crate::application::payment_service::PaymentConfirmation;
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Amount in major units, e.g. "310.63"
    #[schema(value_type = String)]
    pub amount: BigDecimal,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePaymentResponse {
    pub id: String,
    /// Minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

/// POST /payment/create-order
///
/// Opens a payment with the gateway before checkout. The returned id is what
/// the client pays against and later presents with the signature.
#[utoipa::path(
    post,
    path = "/payment/create-order",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Gateway order created", body = CreatePaymentResponse),
        (status = 400, description = "Amount is not positive"),
        (status = 403, description = "Only customers start payments"),
        (status = 502, description = "Gateway unavailable"),
    ),
    tag = "payment"
)]
pub async fn create_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order = state.payments.open(&user.0, &body.amount, body.receipt).await?;
    Ok(HttpResponse::Ok().json(CreatePaymentResponse {
        id: order.id,
        amount: order.amount,
        currency: order.currency,
        key_id: state.payment_key_id.clone(),
    }))
}

/// POST /payment/verify
///
/// Checks a payment before checkout. Placement checks it again and also
/// holds it to the order total.
#[utoipa::path(
    post,
    path = "/payment/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Signature is valid for a payment opened by the caller"),
        (status = 402, description = "Signature is invalid or the payment is unknown"),
    ),
    tag = "payment"
)]
pub async fn verify_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let confirmation = PaymentConfirmation {
        gateway_order_id: body.gateway_order_id,
        payment_id: body.payment_id,
        signature: body.signature,
    };
    let payments = state.payments.clone();
    web::block(move || payments.verify(&user.0, &confirmation)).await??;
    Ok(HttpResponse::Ok().json(json!({ "verified": true })))
}
