use actix_web::{web, HttpResponse};

use crate::server::auth::{authenticate, Credentials};
use crate::server::controller::error::ApiError;
use crate::server::controller::json_body;
use crate::server::database::Store;
use crate::server::model::order::{AssignCrewRequest, OrderDetail, OrderId, UpdateOrderRequest};
use crate::server::model::MessageResponse;
use crate::server::policy::{authorize, Operation};
use crate::server::service::order;

// the order service gates these operations itself since it needs the requester
// for scoping; handlers with a body check the operation once more before decoding it

pub(crate) async fn list_orders<S: Store>(store: web::Data<S>, credentials: Credentials) -> Result<HttpResponse, ApiError> {
    let requester = authenticate(store.get_ref(), &credentials).await?;
    let orders = order::list_orders(store.get_ref(), &requester).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// convert the requester's cart into an order
pub(crate) async fn create_order<S: Store>(store: web::Data<S>, credentials: Credentials) -> Result<HttpResponse, ApiError> {
    let requester = authenticate(store.get_ref(), &credentials).await?;
    let (order, items) = order::create_order(store.get_ref(), &requester).await?;
    Ok(HttpResponse::Created().json(OrderDetail { order, items }))
}

pub(crate) async fn get_order<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<OrderId>,
) -> Result<HttpResponse, ApiError> {
    let requester = authenticate(store.get_ref(), &credentials).await?;
    let (order, items) = order::get_order_items(store.get_ref(), id.into_inner(), &requester).await?;
    Ok(HttpResponse::Ok().json(OrderDetail { order, items }))
}

/// PUT, assign the delivery crew
pub(crate) async fn assign_crew<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<OrderId>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let requester = authenticate(store.get_ref(), &credentials).await?;
    authorize(Operation::AssignDeliveryCrew, &requester)?;
    let req = json_body::<AssignCrewRequest>(&body)?;
    let order = order::assign_delivery_crew(store.get_ref(), id.into_inner(), req.delivery_crew, &requester).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// PATCH, update status and/or crew; an empty body toggles the delivered flag
pub(crate) async fn update_order<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<OrderId>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let requester = authenticate(store.get_ref(), &credentials).await?;
    authorize(Operation::UpdateOrderStatus, &requester)?;
    let id = id.into_inner();
    let order = match body.iter().all(u8::is_ascii_whitespace) {
        true => order::toggle_order_status(store.get_ref(), id, &requester).await?,
        false => {
            let req = json_body::<UpdateOrderRequest>(&body)?;
            order::update_order_status(store.get_ref(), id, req, &requester).await?
        }
    };
    Ok(HttpResponse::Ok().json(order))
}

pub(crate) async fn delete_order<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<OrderId>,
) -> Result<HttpResponse, ApiError> {
    let requester = authenticate(store.get_ref(), &credentials).await?;
    let id = id.into_inner();
    order::delete_order(store.get_ref(), id, &requester).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(format!("Order #{id} was deleted"))))
}
