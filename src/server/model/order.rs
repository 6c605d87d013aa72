use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::server::model::menu_item::MenuItemId;
use crate::server::model::user::UserId;

pub(crate) type OrderId = i64;

/// NUMERIC(14,2) bound of an order total
pub(crate) const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Lifecycle state of an order.
///
/// `Placed` has no delivery crew, `Assigned` has one, `Delivered` is terminal
/// for the crew but a manager may still flip it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OrderStatus {
    Placed,
    Assigned,
    Delivered,
}

impl OrderStatus {
    /// state implied by the legacy delivered flag and the crew assignment
    pub fn settle(delivered: bool, delivery_crew: Option<UserId>) -> Self {
        match (delivered, delivery_crew) {
            (true, _) => OrderStatus::Delivered,
            (false, Some(_)) => OrderStatus::Assigned,
            (false, None) => OrderStatus::Placed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "placed" => Some(OrderStatus::Placed),
            "assigned" => Some(OrderStatus::Assigned),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub delivery_crew: Option<UserId>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub date: NaiveDate,
}

impl Order {
    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }
}

/// Frozen copy of a cart line taken when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct OrderItem {
    pub id: i64,
    pub order: OrderId,
    pub menuitem: MenuItemId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderItemDraft {
    pub menuitem: MenuItemId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

/// Everything needed to write an order, built from the cart inside the
/// checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderDraft {
    pub user: UserId,
    pub total: Decimal,
    pub date: NaiveDate,
    pub items: Vec<OrderItemDraft>,
}

/// Which orders a requester is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrderScope {
    All,
    AssignedTo(UserId),
    PlacedBy(UserId),
}

impl OrderScope {
    pub fn contains(&self, order: &Order) -> bool {
        match *self {
            OrderScope::All => true,
            OrderScope::AssignedTo(crew) => order.delivery_crew == Some(crew),
            OrderScope::PlacedBy(user) => order.user == user,
        }
    }
}

/// Either the legacy boolean flag or an explicit state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusInput {
    Delivered(bool),
    State(OrderStatus),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateOrderRequest {
    pub status: Option<StatusInput>,
    pub delivery_crew: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignCrewRequest {
    pub delivery_crew: UserId,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
