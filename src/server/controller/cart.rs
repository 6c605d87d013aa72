use actix_web::{web, HttpResponse};

use crate::server::auth::{gate, Credentials};
use crate::server::controller::error::ApiError;
use crate::server::controller::json_body;
use crate::server::database::Store;
use crate::server::model::cart::{AddToCartRequest, ClearCartResponse};
use crate::server::policy::Operation;
use crate::server::service::cart;

/// cart lines of the requester
pub(crate) async fn list_cart<S: Store>(store: web::Data<S>, credentials: Credentials) -> Result<HttpResponse, ApiError> {
    let requester = gate(store.get_ref(), &credentials, Operation::ViewCart).await?;
    let lines = cart::list_cart(store.get_ref(), requester.user()?.id).await?;
    Ok(HttpResponse::Ok().json(lines))
}

pub(crate) async fn add_to_cart<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let requester = gate(store.get_ref(), &credentials, Operation::AddToCart).await?;
    let req = json_body::<AddToCartRequest>(&body)?;
    let line = cart::add_to_cart(store.get_ref(), requester.user()?.id, req).await?;
    Ok(HttpResponse::Created().json(line))
}

pub(crate) async fn clear_cart<S: Store>(store: web::Data<S>, credentials: Credentials) -> Result<HttpResponse, ApiError> {
    let requester = gate(store.get_ref(), &credentials, Operation::ClearCart).await?;
    let removed = cart::clear_cart(store.get_ref(), requester.user()?.id).await?;
    Ok(HttpResponse::Ok().json(ClearCartResponse { removed }))
}
