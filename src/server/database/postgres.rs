use std::future::Future;
use std::time::Duration;
use log::warn;
use rust_decimal::Decimal;
use tokio::time;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};
use crate::server::database::connection::Connection;
use crate::server::database::pool::Pool;
use crate::server::database::{Store, StoreError};
use crate::server::model::cart::CartLine;
use crate::server::model::category::{Category, CategoryId};
use crate::server::model::menu_item::{MenuItem, MenuItemId, MenuItemInput, MenuItemQuery, Ordering, SortField};
use crate::server::model::order::{Order, OrderDraft, OrderId, OrderItem, OrderScope, OrderStatus};
use crate::server::model::user::{Role, User, UserId};

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.is_staff,
           COALESCE(array_agg(g.name) FILTER (WHERE g.name IS NOT NULL), '{}') AS groups
    FROM app_user u
    LEFT JOIN user_group g
    ON g.user_id = u.id
"#;

/// PostgreSQL backed store. Every call holds one pooled connection and is
/// bounded by the configured timeout.
#[derive(Clone)]
pub(crate) struct PgStore {
    pool: Pool<Client>,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: Pool<Client>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn conn(&self) -> Result<Connection<Client>, StoreError> {
        self.pool.acquire().await.ok_or(StoreError::Busy)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        let sleep = time::sleep(self.timeout);
        tokio::pin!(sleep);
        tokio::select! {
            result = fut => result.map_err(|e| {
                warn!("{} failed, {}", op, e);
                StoreError::from(e)
            }),
            _ = &mut sleep => {
                warn!("timeout in {}", op);
                Err(StoreError::Timeout)
            }
        }
    }

    async fn find_user(&self, op: &'static str, sql: &str, param: &(dyn ToSql + Sync)) -> Result<Option<User>, StoreError> {
        let conn = self.conn().await?;
        let row = self.bounded(op, conn.query_opt(sql, &[param])).await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &Row) -> Result<User, StoreError> {
    let groups: Vec<String> = row.try_get("groups")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_staff: row.try_get("is_staff")?,
        groups: groups.iter().filter_map(|g| Role::from_group_name(g)).collect(),
    })
}

fn category_from_row(row: &Row) -> Result<Category, StoreError> {
    Ok(Category {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
    })
}

fn menu_item_from_row(row: &Row) -> Result<MenuItem, StoreError> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        price: row.try_get("price")?,
        featured: row.try_get("featured")?,
        category: row.try_get("category_id")?,
    })
}

fn cart_line_from_row(row: &Row) -> Result<CartLine, StoreError> {
    Ok(CartLine {
        id: row.try_get("id")?,
        user: row.try_get("user_id")?,
        menuitem: row.try_get("menu_item_id")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        price: row.try_get("price")?,
    })
}

fn order_from_row(row: &Row) -> Result<Order, StoreError> {
    let delivery_crew: Option<UserId> = row.try_get("delivery_crew_id")?;
    let status: &str = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        user: row.try_get("user_id")?,
        // a crew member deleted out from under an assigned order leaves it placed
        status: OrderStatus::settle(OrderStatus::parse(status) == Some(OrderStatus::Delivered), delivery_crew),
        delivery_crew,
        total: row.try_get("total")?,
        date: row.try_get("date")?,
    })
}

fn order_item_from_row(row: &Row) -> Result<OrderItem, StoreError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order: row.try_get("order_id")?,
        menuitem: row.try_get("menu_item_id")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        price: row.try_get("price")?,
    })
}

/// escape LIKE wildcards and wrap the needle for a substring match
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn order_by(ordering: Option<Ordering>) -> &'static str {
    match ordering {
        None => "m.id",
        Some(Ordering { field: SortField::Price, descending: false }) => "m.price ASC, m.id",
        Some(Ordering { field: SortField::Price, descending: true }) => "m.price DESC, m.id",
        Some(Ordering { field: SortField::Category, descending: false }) => "m.category_id ASC, m.id",
        Some(Ordering { field: SortField::Category, descending: true }) => "m.category_id DESC, m.id",
    }
}

impl Store for PgStore {
    async fn user_by_token(&self, key: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("{USER_SELECT} WHERE u.id = (SELECT user_id FROM auth_token WHERE key = $1) GROUP BY u.id");
        self.find_user("user_by_token", &sql, &key).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1 GROUP BY u.id");
        self.find_user("user_by_id", &sql, &id).await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("{USER_SELECT} WHERE u.username = $1 GROUP BY u.id");
        self.find_user("user_by_username", &sql, &username).await
    }

    async fn users_in_group(&self, role: Role) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "{USER_SELECT} WHERE u.id IN (SELECT user_id FROM user_group WHERE name = $1) GROUP BY u.id ORDER BY u.id"
        );
        let conn = self.conn().await?;
        let rows = self
            .bounded("users_in_group", conn.query(sql.as_str(), &[&role.group_name()]))
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn add_to_group(&self, user: UserId, role: Role) -> Result<bool, StoreError> {
        let conn = self.conn().await?;
        let inserted = self
            .bounded(
                "add_to_group",
                conn.execute(
                    "INSERT INTO user_group (user_id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                    &[&user, &role.group_name()],
                ),
            )
            .await?;
        Ok(inserted == 1)
    }

    async fn remove_from_group(&self, user: UserId, role: Role) -> Result<bool, StoreError> {
        let conn = self.conn().await?;
        let removed = self
            .bounded(
                "remove_from_group",
                conn.execute(
                    "DELETE FROM user_group WHERE user_id = $1 AND name = $2",
                    &[&user, &role.group_name()],
                ),
            )
            .await?;
        Ok(removed == 1)
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let conn = self.conn().await?;
        let rows = self
            .bounded("categories", conn.query("SELECT id, title FROM category ORDER BY id", &[]))
            .await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let conn = self.conn().await?;
        let row = self
            .bounded("category", conn.query_opt("SELECT id, title FROM category WHERE id = $1", &[&id]))
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn insert_category(&self, title: &str) -> Result<Category, StoreError> {
        let conn = self.conn().await?;
        let row = self
            .bounded(
                "insert_category",
                conn.query_one("INSERT INTO category (title) VALUES ($1) RETURNING id, title", &[&title]),
            )
            .await?;
        category_from_row(&row)
    }

    async fn menu_items(&self, query: &MenuItemQuery) -> Result<(u64, Vec<MenuItem>), StoreError> {
        let pattern = query.search.as_deref().map(like_pattern);
        let limit = query.pagination.limit() as i64;
        let offset = query.pagination.offset() as i64;

        let mut clauses = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(5);
        if let Some(price) = &query.price {
            params.push(price);
            clauses.push(format!("m.price = ${}", params.len()));
        }
        if let Some(category) = &query.category {
            params.push(category);
            clauses.push(format!("m.category_id = ${}", params.len()));
        }
        if let Some(pattern) = &pattern {
            params.push(pattern);
            clauses.push(format!("(m.title ILIKE ${0} OR c.title ILIKE ${0})", params.len()));
        }
        let filter = match clauses.is_empty() {
            true => String::new(),
            false => format!(" WHERE {}", clauses.join(" AND ")),
        };
        let filter_len = params.len();

        let count_stmt = format!("SELECT COUNT(*) FROM menu_item m JOIN category c ON c.id = m.category_id{filter}");
        params.extend([&limit as &(dyn ToSql + Sync), &offset as &(dyn ToSql + Sync)]);
        let page_stmt = format!(
            r#"
            SELECT m.id, m.title, m.price, m.featured, m.category_id
            FROM menu_item m
            JOIN category c
            ON c.id = m.category_id{filter}
            ORDER BY {}
            LIMIT ${} OFFSET ${}
            "#,
            order_by(query.ordering),
            filter_len + 1,
            filter_len + 2,
        );

        let conn = self.conn().await?;
        let count_row = self
            .bounded("count_menu_items", conn.query_one(count_stmt.as_str(), &params[..filter_len]))
            .await?;
        let count: i64 = count_row.try_get(0)?;
        let rows = self
            .bounded("menu_items", conn.query(page_stmt.as_str(), &params))
            .await?;
        let items = rows.iter().map(menu_item_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((count as u64, items))
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        let conn = self.conn().await?;
        let row = self
            .bounded(
                "menu_item",
                conn.query_opt(
                    "SELECT id, title, price, featured, category_id FROM menu_item WHERE id = $1",
                    &[&id],
                ),
            )
            .await?;
        row.as_ref().map(menu_item_from_row).transpose()
    }

    async fn insert_menu_item(&self, item: &MenuItemInput) -> Result<MenuItem, StoreError> {
        let conn = self.conn().await?;
        let row = self
            .bounded(
                "insert_menu_item",
                conn.query_one(
                    r#"
                    INSERT INTO menu_item (title, price, featured, category_id)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, title, price, featured, category_id
                    "#,
                    &[&item.title, &item.price, &item.featured, &item.category],
                ),
            )
            .await?;
        menu_item_from_row(&row)
    }

    async fn update_menu_item(&self, id: MenuItemId, item: &MenuItemInput) -> Result<Option<MenuItem>, StoreError> {
        let conn = self.conn().await?;
        let row = self
            .bounded(
                "update_menu_item",
                conn.query_opt(
                    r#"
                    UPDATE menu_item
                    SET title = $2, price = $3, featured = $4, category_id = $5
                    WHERE id = $1
                    RETURNING id, title, price, featured, category_id
                    "#,
                    &[&id, &item.title, &item.price, &item.featured, &item.category],
                ),
            )
            .await?;
        row.as_ref().map(menu_item_from_row).transpose()
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool, StoreError> {
        let conn = self.conn().await?;
        let deleted = self
            .bounded("delete_menu_item", conn.execute("DELETE FROM menu_item WHERE id = $1", &[&id]))
            .await?;
        Ok(deleted == 1)
    }

    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, StoreError> {
        let conn = self.conn().await?;
        let rows = self
            .bounded(
                "cart_lines",
                conn.query(
                    r#"
                    SELECT id, user_id, menu_item_id, quantity, unit_price, price
                    FROM cart_line
                    WHERE user_id = $1
                    ORDER BY id
                    "#,
                    &[&user],
                ),
            )
            .await?;
        rows.iter().map(cart_line_from_row).collect()
    }

    async fn add_cart_line(
        &self,
        user: UserId,
        menuitem: MenuItemId,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<CartLine, StoreError> {
        let price = unit_price * Decimal::from(quantity);
        let mut conn = self.conn().await?;
        let txn = self.bounded("begin", conn.transaction()).await?;
        // serializes with checkout of the same user
        self.bounded("lock_cart", txn.execute("SELECT pg_advisory_xact_lock($1)", &[&user]))
            .await?;
        let row = self
            .bounded(
                "add_cart_line",
                txn.query_one(
                    r#"
                    INSERT INTO cart_line (user_id, menu_item_id, quantity, unit_price, price)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (user_id, menu_item_id) DO UPDATE
                    SET quantity = cart_line.quantity + EXCLUDED.quantity,
                        unit_price = EXCLUDED.unit_price,
                        price = EXCLUDED.unit_price * (cart_line.quantity + EXCLUDED.quantity)
                    RETURNING id, user_id, menu_item_id, quantity, unit_price, price
                    "#,
                    &[&user, &menuitem, &quantity, &unit_price, &price],
                ),
            )
            .await?;
        let line = cart_line_from_row(&row)?;
        self.bounded("commit", txn.commit()).await?;
        Ok(line)
    }

    async fn clear_cart(&self, user: UserId) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        let txn = self.bounded("begin", conn.transaction()).await?;
        self.bounded("lock_cart", txn.execute("SELECT pg_advisory_xact_lock($1)", &[&user]))
            .await?;
        let removed = self
            .bounded("clear_cart", txn.execute("DELETE FROM cart_line WHERE user_id = $1", &[&user]))
            .await?;
        self.bounded("commit", txn.commit()).await?;
        Ok(removed)
    }

    async fn place_order<F, E>(&self, user: UserId, build: F) -> Result<(Order, Vec<OrderItem>), E>
    where
        F: FnOnce(&[CartLine]) -> Result<OrderDraft, E>,
        E: From<StoreError>,
    {
        let mut conn = self.conn().await?;
        let txn = self.bounded("begin", conn.transaction()).await?;
        self.bounded("lock_cart", txn.execute("SELECT pg_advisory_xact_lock($1)", &[&user]))
            .await?;
        let rows = self
            .bounded(
                "checkout_cart",
                txn.query(
                    r#"
                    SELECT id, user_id, menu_item_id, quantity, unit_price, price
                    FROM cart_line
                    WHERE user_id = $1
                    ORDER BY id
                    FOR UPDATE
                    "#,
                    &[&user],
                ),
            )
            .await?;
        let lines = rows.iter().map(cart_line_from_row).collect::<Result<Vec<_>, _>>()?;

        // dropping the transaction on any early return rolls it back
        let draft = build(&lines)?;

        let row = self
            .bounded(
                "insert_order",
                txn.query_one(
                    r#"
                    INSERT INTO orders (user_id, delivery_crew_id, status, total, date)
                    VALUES ($1, NULL, $2, $3, $4)
                    RETURNING id, user_id, delivery_crew_id, status, total, date
                    "#,
                    &[&draft.user, &OrderStatus::Placed.as_str(), &draft.total, &draft.date],
                ),
            )
            .await?;
        let order = order_from_row(&row)?;

        let mut items = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let row = self
                .bounded(
                    "insert_order_item",
                    txn.query_one(
                        r#"
                        INSERT INTO order_item (order_id, menu_item_id, quantity, unit_price, price)
                        VALUES ($1, $2, $3, $4, $5)
                        RETURNING id, order_id, menu_item_id, quantity, unit_price, price
                        "#,
                        &[&order.id, &item.menuitem, &item.quantity, &item.unit_price, &item.price],
                    ),
                )
                .await?;
            items.push(order_item_from_row(&row)?);
        }

        let consumed = lines.iter().map(|l| l.id).collect::<Vec<i64>>();
        self.bounded(
            "consume_cart",
            txn.execute("DELETE FROM cart_line WHERE id = ANY($1)", &[&consumed]),
        )
        .await?;
        self.bounded("commit", txn.commit()).await?;
        Ok((order, items))
    }

    async fn orders(&self, scope: OrderScope) -> Result<Vec<Order>, StoreError> {
        let (filter, owner) = match scope {
            OrderScope::All => ("", None),
            OrderScope::AssignedTo(crew) => (" WHERE delivery_crew_id = $1", Some(crew)),
            OrderScope::PlacedBy(user) => (" WHERE user_id = $1", Some(user)),
        };
        let sql = format!("SELECT id, user_id, delivery_crew_id, status, total, date FROM orders{filter} ORDER BY id");
        let params = owner.iter().map(|id| id as &(dyn ToSql + Sync)).collect::<Vec<_>>();
        let conn = self.conn().await?;
        let rows = self.bounded("orders", conn.query(sql.as_str(), &params)).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let conn = self.conn().await?;
        let row = self
            .bounded(
                "order",
                conn.query_opt(
                    "SELECT id, user_id, delivery_crew_id, status, total, date FROM orders WHERE id = $1",
                    &[&id],
                ),
            )
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let conn = self.conn().await?;
        let rows = self
            .bounded(
                "order_items",
                conn.query(
                    r#"
                    SELECT id, order_id, menu_item_id, quantity, unit_price, price
                    FROM order_item
                    WHERE order_id = $1
                    ORDER BY id
                    "#,
                    &[&order],
                ),
            )
            .await?;
        rows.iter().map(order_item_from_row).collect()
    }

    async fn save_order(&self, order: &Order) -> Result<bool, StoreError> {
        let conn = self.conn().await?;
        let updated = self
            .bounded(
                "save_order",
                conn.execute(
                    "UPDATE orders SET delivery_crew_id = $2, status = $3 WHERE id = $1",
                    &[&order.id, &order.delivery_crew, &order.status.as_str()],
                ),
            )
            .await?;
        Ok(updated == 1)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        let conn = self.conn().await?;
        let deleted = self
            .bounded("delete_order", conn.execute("DELETE FROM orders WHERE id = $1", &[&id]))
            .await?;
        Ok(deleted == 1)
    }
}
