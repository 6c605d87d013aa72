//! Per-user cart. Lines are keyed by (user, menu item); adding an item that
//! is already in the cart raises its quantity and recaptures the unit price.

use log::info;
use crate::server::controller::error::ApiError;
use crate::server::database::Store;
use crate::server::model::cart::{AddToCartRequest, CartLine, MAX_LINE_QUANTITY};
use crate::server::model::user::UserId;

pub(crate) async fn list_cart<S: Store>(store: &S, user: UserId) -> Result<Vec<CartLine>, ApiError> {
    Ok(store.cart_lines(user).await?)
}

pub(crate) async fn add_to_cart<S: Store>(store: &S, user: UserId, req: AddToCartRequest) -> Result<CartLine, ApiError> {
    if req.quantity < 1 {
        return Err(ApiError::validation("quantity", "ensure this value is greater than or equal to 1"));
    }
    if req.quantity > MAX_LINE_QUANTITY {
        return Err(ApiError::validation(
            "quantity",
            format!("ensure this value is less than or equal to {MAX_LINE_QUANTITY}"),
        ));
    }
    let item = store
        .menu_item(req.menuitem)
        .await?
        .ok_or(ApiError::NotFound("menu item"))?;
    let line = store.add_cart_line(user, item.id, req.quantity, item.price).await?;
    info!("user {} has {} x menu item {} in cart", user, line.quantity, item.id);
    Ok(line)
}

/// returns the number of removed lines
pub(crate) async fn clear_cart<S: Store>(store: &S, user: UserId) -> Result<u64, ApiError> {
    Ok(store.clear_cart(user).await?)
}
