//! In-process store with the same semantics as the PostgreSQL one, used by tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use crate::server::database::{Store, StoreError};
use crate::server::model::cart::{CartLine, MAX_LINE_PRICE, MAX_LINE_QUANTITY};
use crate::server::model::category::{Category, CategoryId};
use crate::server::model::menu_item::{MenuItem, MenuItemId, MenuItemInput, MenuItemQuery, SortField};
use crate::server::model::order::{Order, OrderDraft, OrderId, OrderItem, OrderScope, OrderStatus};
use crate::server::model::user::{Role, User, UserId};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    categories: BTreeMap<CategoryId, Category>,
    menu_items: BTreeMap<MenuItemId, MenuItem>,
    cart_lines: BTreeMap<i64, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<i64, OrderItem>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// register a user with a login token equal to its username
    pub fn add_user(&self, username: &str, groups: &[Role]) -> User {
        let mut t = self.tables();
        let id = t.next_id();
        let user = User {
            id,
            username: username.to_string(),
            email: format!("{username}@littlelemon.test"),
            is_staff: false,
            groups: groups.iter().copied().collect::<BTreeSet<_>>(),
        };
        t.users.insert(id, user.clone());
        t.tokens.insert(username.to_string(), id);
        user
    }

    pub fn add_staff(&self, username: &str) -> User {
        let user = self.add_user(username, &[]);
        let mut t = self.tables();
        let staff = t.users.get_mut(&user.id).expect("just inserted");
        staff.is_staff = true;
        staff.clone()
    }

    pub fn add_category(&self, title: &str) -> Category {
        let mut t = self.tables();
        let id = t.next_id();
        let category = Category { id, title: title.to_string() };
        t.categories.insert(id, category.clone());
        category
    }

    pub fn add_menu_item(&self, title: &str, price: Decimal, category: CategoryId) -> MenuItem {
        let mut t = self.tables();
        let id = t.next_id();
        let item = MenuItem {
            id,
            title: title.to_string(),
            price,
            featured: false,
            category,
        };
        t.menu_items.insert(id, item.clone());
        item
    }

    pub fn order_count(&self) -> usize {
        self.tables().orders.len()
    }
}

impl Store for MemoryStore {
    async fn user_by_token(&self, key: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables();
        Ok(t.tokens.get(key).and_then(|id| t.users.get(id)).cloned())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables().users.values().find(|u| u.username == username).cloned())
    }

    async fn users_in_group(&self, role: Role) -> Result<Vec<User>, StoreError> {
        Ok(self.tables().users.values().filter(|u| u.is_member(role)).cloned().collect())
    }

    async fn add_to_group(&self, user: UserId, role: Role) -> Result<bool, StoreError> {
        let mut t = self.tables();
        let user = t.users.get_mut(&user).ok_or_else(|| StoreError::Conflict("a referenced record no longer exists".into()))?;
        Ok(user.groups.insert(role))
    }

    async fn remove_from_group(&self, user: UserId, role: Role) -> Result<bool, StoreError> {
        let mut t = self.tables();
        Ok(t.users.get_mut(&user).is_some_and(|u| u.groups.remove(&role)))
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.tables().categories.values().cloned().collect())
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.tables().categories.get(&id).cloned())
    }

    async fn insert_category(&self, title: &str) -> Result<Category, StoreError> {
        Ok(self.add_category(title))
    }

    async fn menu_items(&self, query: &MenuItemQuery) -> Result<(u64, Vec<MenuItem>), StoreError> {
        let t = self.tables();
        let mut matches = t
            .menu_items
            .values()
            .filter(|m| query.price.map_or(true, |p| m.price == p))
            .filter(|m| query.category.map_or(true, |c| m.category == c))
            .filter(|m| match &query.search {
                None => true,
                Some(needle) => {
                    let category_title = t
                        .categories
                        .get(&m.category)
                        .map(|c| c.title.to_lowercase())
                        .unwrap_or_default();
                    m.title.to_lowercase().contains(needle.as_str()) || category_title.contains(needle.as_str())
                }
            })
            .cloned()
            .collect::<Vec<_>>();
        if let Some(ordering) = query.ordering {
            // stable sort keeps id order among equal keys
            matches.sort_by(|a, b| {
                let ord = match ordering.field {
                    SortField::Price => a.price.cmp(&b.price),
                    SortField::Category => a.category.cmp(&b.category),
                };
                if ordering.descending { ord.reverse() } else { ord }
            });
        }
        let count = matches.len() as u64;
        let page = matches
            .into_iter()
            .skip(query.pagination.offset())
            .take(query.pagination.limit())
            .collect();
        Ok((count, page))
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        Ok(self.tables().menu_items.get(&id).cloned())
    }

    async fn insert_menu_item(&self, item: &MenuItemInput) -> Result<MenuItem, StoreError> {
        let mut t = self.tables();
        if !t.categories.contains_key(&item.category) {
            return Err(StoreError::Conflict("category is missing or still has menu items".into()));
        }
        let id = t.next_id();
        let item = MenuItem {
            id,
            title: item.title.clone(),
            price: item.price,
            featured: item.featured,
            category: item.category,
        };
        t.menu_items.insert(id, item.clone());
        Ok(item)
    }

    async fn update_menu_item(&self, id: MenuItemId, item: &MenuItemInput) -> Result<Option<MenuItem>, StoreError> {
        let mut t = self.tables();
        let Some(existing) = t.menu_items.get_mut(&id) else {
            return Ok(None);
        };
        existing.title = item.title.clone();
        existing.price = item.price;
        existing.featured = item.featured;
        existing.category = item.category;
        Ok(Some(existing.clone()))
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool, StoreError> {
        let mut t = self.tables();
        if t.order_items.values().any(|i| i.menuitem == id) {
            return Err(StoreError::Conflict("menu item is referenced by existing orders".into()));
        }
        t.cart_lines.retain(|_, l| l.menuitem != id);
        Ok(t.menu_items.remove(&id).is_some())
    }

    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, StoreError> {
        Ok(self.tables().cart_lines.values().filter(|l| l.user == user).cloned().collect())
    }

    async fn add_cart_line(
        &self,
        user: UserId,
        menuitem: MenuItemId,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<CartLine, StoreError> {
        let mut t = self.tables();
        let existing = t
            .cart_lines
            .values()
            .find(|l| l.user == user && l.menuitem == menuitem)
            .map(|l| (l.id, l.quantity));
        let (id, quantity) = match existing {
            Some((id, current)) => (id, current + quantity),
            None => (t.next_id(), quantity),
        };
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(StoreError::Constraint {
                field: "quantity",
                message: "quantity is out of range".into(),
            });
        }
        let price = unit_price * Decimal::from(quantity);
        if price > MAX_LINE_PRICE {
            return Err(StoreError::Constraint {
                field: "quantity",
                message: "line amount is out of range".into(),
            });
        }
        let line = CartLine {
            id,
            user,
            menuitem,
            quantity,
            unit_price,
            price,
        };
        t.cart_lines.insert(id, line.clone());
        Ok(line)
    }

    async fn clear_cart(&self, user: UserId) -> Result<u64, StoreError> {
        let mut t = self.tables();
        let before = t.cart_lines.len();
        t.cart_lines.retain(|_, l| l.user != user);
        Ok((before - t.cart_lines.len()) as u64)
    }

    async fn place_order<F, E>(&self, user: UserId, build: F) -> Result<(Order, Vec<OrderItem>), E>
    where
        F: FnOnce(&[CartLine]) -> Result<OrderDraft, E>,
        E: From<StoreError>,
    {
        // the guard spans the whole checkout, which makes it atomic
        let mut t = self.tables();
        let lines = t.cart_lines.values().filter(|l| l.user == user).cloned().collect::<Vec<_>>();
        let draft = build(&lines)?;

        let id = t.next_id();
        let order = Order {
            id,
            user: draft.user,
            delivery_crew: None,
            status: OrderStatus::Placed,
            total: draft.total,
            date: draft.date,
        };
        let mut items = Vec::with_capacity(draft.items.len());
        for item in draft.items {
            let item_id = t.next_id();
            items.push(OrderItem {
                id: item_id,
                order: id,
                menuitem: item.menuitem,
                quantity: item.quantity,
                unit_price: item.unit_price,
                price: item.price,
            });
        }
        t.orders.insert(id, order.clone());
        t.order_items.extend(items.iter().map(|i| (i.id, i.clone())));
        for line in &lines {
            t.cart_lines.remove(&line.id);
        }
        Ok((order, items))
    }

    async fn orders(&self, scope: OrderScope) -> Result<Vec<Order>, StoreError> {
        Ok(self.tables().orders.values().filter(|o| scope.contains(o)).cloned().collect())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables().orders.get(&id).cloned())
    }

    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.tables().order_items.values().filter(|i| i.order == order).cloned().collect())
    }

    async fn save_order(&self, order: &Order) -> Result<bool, StoreError> {
        let mut t = self.tables();
        let Some(existing) = t.orders.get_mut(&order.id) else {
            return Ok(false);
        };
        existing.delivery_crew = order.delivery_crew;
        existing.status = order.status;
        Ok(true)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut t = self.tables();
        t.order_items.retain(|_, i| i.order != id);
        Ok(t.orders.remove(&id).is_some())
    }
}
