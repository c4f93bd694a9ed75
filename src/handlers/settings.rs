use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryChargeBody {
    #[schema(value_type = String)]
    pub delivery_charge: BigDecimal,
}

/// GET /settings/delivery-charge
///
/// The fee applied to orders placed from now on.
#[utoipa::path(
    get,
    path = "/settings/delivery-charge",
    responses((status = 200, description = "Current delivery charge", body = DeliveryChargeBody)),
    tag = "settings"
)]
pub async fn get_delivery_charge(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let delivery_charge = web::block(move || state.settings.delivery_charge()).await??;
    Ok(HttpResponse::Ok().json(DeliveryChargeBody { delivery_charge }))
}

#[utoipa::path(
    put,
    path = "/settings/delivery-charge",
    request_body = DeliveryChargeBody,
    responses(
        (status = 200, description = "Delivery charge updated", body = DeliveryChargeBody),
        (status = 400, description = "Negative amount"),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "settings"
)]
pub async fn set_delivery_charge(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<DeliveryChargeBody>,
) -> Result<HttpResponse, AppError> {
    let value = body.into_inner().delivery_charge;
    let delivery_charge = web::block(move || state.settings.set_delivery_charge(&user.0, value)).await??;
    Ok(HttpResponse::Ok().json(DeliveryChargeBody { delivery_charge }))
}
