use rust_decimal::Decimal;
use crate::server::database::StoreError;
use crate::server::model::cart::CartLine;
use crate::server::model::category::{Category, CategoryId};
use crate::server::model::menu_item::{MenuItem, MenuItemId, MenuItemInput, MenuItemQuery};
use crate::server::model::order::{Order, OrderDraft, OrderId, OrderItem, OrderScope};
use crate::server::model::user::{Role, User, UserId};

/// CRUD + filter operations the ordering core runs against.
///
/// Implementations are used through generics only, request handlers are
/// instantiated once per store type.
pub(crate) trait Store: 'static {
    async fn user_by_token(&self, key: &str) -> Result<Option<User>, StoreError>;
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn users_in_group(&self, role: Role) -> Result<Vec<User>, StoreError>;
    /// `false` when the user already was a member
    async fn add_to_group(&self, user: UserId, role: Role) -> Result<bool, StoreError>;
    /// `false` when the user was not a member
    async fn remove_from_group(&self, user: UserId, role: Role) -> Result<bool, StoreError>;

    async fn categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&self, title: &str) -> Result<Category, StoreError>;

    /// one page of matching items plus the total match count
    async fn menu_items(&self, query: &MenuItemQuery) -> Result<(u64, Vec<MenuItem>), StoreError>;
    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError>;
    async fn insert_menu_item(&self, item: &MenuItemInput) -> Result<MenuItem, StoreError>;
    async fn update_menu_item(&self, id: MenuItemId, item: &MenuItemInput) -> Result<Option<MenuItem>, StoreError>;
    /// fails with `Conflict` while order items still reference the menu item
    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool, StoreError>;

    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, StoreError>;
    /// Upsert keyed by (user, menu item): quantities add up and the unit price
    /// is recaptured.
    async fn add_cart_line(
        &self,
        user: UserId,
        menuitem: MenuItemId,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<CartLine, StoreError>;
    async fn clear_cart(&self, user: UserId) -> Result<u64, StoreError>;

    /// Converts the user's cart into an order in a single transaction.
    ///
    /// The cart is locked, `build` turns its lines into a draft, the order and
    /// its items are written and exactly the consumed lines are removed. Any
    /// error, including one returned by `build`, leaves the store untouched.
    async fn place_order<F, E>(&self, user: UserId, build: F) -> Result<(Order, Vec<OrderItem>), E>
    where
        F: FnOnce(&[CartLine]) -> Result<OrderDraft, E>,
        E: From<StoreError>;
    async fn orders(&self, scope: OrderScope) -> Result<Vec<Order>, StoreError>;
    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>, StoreError>;
    /// persists crew and status, `false` when the order is gone
    async fn save_order(&self, order: &Order) -> Result<bool, StoreError>;
    /// deletes the order together with its items
    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError>;
}
