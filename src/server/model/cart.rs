use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::server::model::menu_item::MenuItemId;
use crate::server::model::user::UserId;

pub(crate) type CartLineId = i64;

/// upper bound for the quantity of a single cart line, merged lines included
pub(crate) const MAX_LINE_QUANTITY: i32 = 999;
/// NUMERIC(10,2) bound of a line price
pub(crate) const MAX_LINE_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// One pending line of a user's cart. `unit_price` is captured from the menu
/// item when the line is written and never follows later price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CartLine {
    pub id: CartLineId,
    pub user: UserId,
    pub menuitem: MenuItemId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddToCartRequest {
    pub menuitem: MenuItemId,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClearCartResponse {
    pub removed: u64,
}
