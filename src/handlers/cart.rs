use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::domain::catalog::CartView;
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    /// Added to the current quantity; may be negative. Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveFromCartRequest {
    pub product_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/cart",
    responses((status = 200, description = "The caller's cart", body = CartView)),
    tag = "cart"
)]
pub async fn get_cart(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || state.carts.get(&user.0)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

#[utoipa::path(
    post,
    path = "/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Unknown product"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let cart = web::block(move || state.carts.add(&user.0, body.product_id, body.quantity)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

#[utoipa::path(
    post,
    path = "/cart/remove",
    request_body = RemoveFromCartRequest,
    responses((status = 200, description = "Updated cart", body = CartView)),
    tag = "cart"
)]
pub async fn remove_from_cart(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<RemoveFromCartRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = body.into_inner().product_id;
    let cart = web::block(move || state.carts.remove(&user.0, product_id)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

#[utoipa::path(
    delete,
    path = "/cart",
    responses((status = 200, description = "Emptied cart", body = CartView)),
    tag = "cart"
)]
pub async fn clear_cart(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || state.carts.clear(&user.0)).await??;
    Ok(HttpResponse::Ok().json(cart))
}
