//! Order lifecycle: checkout of the cart, crew assignment, status changes.
//!
//! Every operation here takes the requester and checks both the operation
//! gate and the order scope from [`crate::server::policy`].

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use crate::server::controller::error::ApiError;
use crate::server::database::Store;
use crate::server::model::cart::CartLine;
use crate::server::model::order::{
    Order, OrderDraft, OrderId, OrderItem, OrderItemDraft, OrderStatus, StatusInput, UpdateOrderRequest,
    MAX_ORDER_TOTAL,
};
use crate::server::model::user::{Role, UserId};
use crate::server::policy::{authorize, order_scope, Operation, Requester};
use crate::server::util::time;

/// Snapshot the cart lines into an order draft. The total is the exact sum
/// of the line prices.
pub(crate) fn draft_from_cart(user: UserId, lines: &[CartLine], date: NaiveDate) -> Result<OrderDraft, ApiError> {
    if lines.is_empty() {
        return Err(ApiError::EmptyCart);
    }
    let total = lines
        .iter()
        .try_fold(Decimal::ZERO, |sum, l| sum.checked_add(l.price))
        .filter(|total| *total <= MAX_ORDER_TOTAL)
        .ok_or_else(|| ApiError::validation("total", format!("order total may not exceed {MAX_ORDER_TOTAL}")))?;
    Ok(OrderDraft {
        user,
        total,
        date,
        items: lines
            .iter()
            .map(|l| OrderItemDraft {
                menuitem: l.menuitem,
                quantity: l.quantity,
                unit_price: l.unit_price,
                price: l.price,
            })
            .collect(),
    })
}

pub(crate) async fn create_order<S: Store>(store: &S, requester: &Requester) -> Result<(Order, Vec<OrderItem>), ApiError> {
    authorize(Operation::PlaceOrder, requester)?;
    let user = requester.user()?.id;
    let date = time::today();
    let (order, items) = store
        .place_order(user, |lines| draft_from_cart(user, lines, date))
        .await?;
    info!("order {} placed by user {} with {} items, total {}", order.id, user, items.len(), order.total);
    Ok((order, items))
}

/// Managers see every order, delivery crew the ones assigned to them and
/// everybody else their own.
pub(crate) async fn list_orders<S: Store>(store: &S, requester: &Requester) -> Result<Vec<Order>, ApiError> {
    authorize(Operation::ListOrders, requester)?;
    Ok(store.orders(order_scope(requester)?).await?)
}

/// Load an order the requester may act on.
async fn scoped_order<S: Store>(store: &S, id: OrderId, requester: &Requester) -> Result<Order, ApiError> {
    let order = store.order(id).await?.ok_or(ApiError::NotFound("order"))?;
    match order_scope(requester)?.contains(&order) {
        true => Ok(order),
        false => Err(ApiError::Forbidden),
    }
}

pub(crate) async fn get_order_items<S: Store>(
    store: &S,
    id: OrderId,
    requester: &Requester,
) -> Result<(Order, Vec<OrderItem>), ApiError> {
    authorize(Operation::ViewOrder, requester)?;
    let order = scoped_order(store, id, requester).await?;
    let items = store.order_items(order.id).await?;
    Ok((order, items))
}

/// The new crew must exist and belong to the delivery crew group.
async fn resolve_crew<S: Store>(store: &S, crew: UserId) -> Result<UserId, ApiError> {
    let user = store
        .user_by_id(crew)
        .await?
        .ok_or(ApiError::NotFound("delivery crew user"))?;
    if !user.is_member(Role::DeliveryCrew) {
        return Err(ApiError::validation("delivery_crew", "user is not a member of the delivery crew"));
    }
    Ok(user.id)
}

async fn save<S: Store>(store: &S, order: Order) -> Result<Order, ApiError> {
    match store.save_order(&order).await? {
        true => Ok(order),
        false => Err(ApiError::NotFound("order")),
    }
}

/// Set the delivery crew. A delivered order stays delivered.
pub(crate) async fn assign_delivery_crew<S: Store>(
    store: &S,
    id: OrderId,
    crew: UserId,
    requester: &Requester,
) -> Result<Order, ApiError> {
    authorize(Operation::AssignDeliveryCrew, requester)?;
    let mut order = store.order(id).await?.ok_or(ApiError::NotFound("order"))?;
    let crew = resolve_crew(store, crew).await?;
    order.delivery_crew = Some(crew);
    order.status = OrderStatus::settle(order.is_delivered(), order.delivery_crew);
    let order = save(store, order).await?;
    info!("order {} assigned to delivery crew {}", order.id, crew);
    Ok(order)
}

/// Managers may change status and crew in one call, the assigned crew member
/// only the status.
pub(crate) async fn update_order_status<S: Store>(
    store: &S,
    id: OrderId,
    req: UpdateOrderRequest,
    requester: &Requester,
) -> Result<Order, ApiError> {
    authorize(Operation::UpdateOrderStatus, requester)?;
    if req.status.is_none() && req.delivery_crew.is_none() {
        return Err(ApiError::validation("status", "nothing to update"));
    }
    let mut order = scoped_order(store, id, requester).await?;

    if let Some(crew) = req.delivery_crew {
        authorize(Operation::AssignDeliveryCrew, requester)?;
        order.delivery_crew = Some(resolve_crew(store, crew).await?);
    }

    let delivered = match req.status {
        None => order.is_delivered(),
        Some(StatusInput::Delivered(flag)) => flag,
        Some(StatusInput::State(OrderStatus::Delivered)) => true,
        Some(StatusInput::State(OrderStatus::Assigned)) if order.delivery_crew.is_none() => {
            return Err(ApiError::validation("status", "order has no delivery crew"));
        }
        Some(StatusInput::State(OrderStatus::Placed)) if order.delivery_crew.is_some() => {
            return Err(ApiError::validation("status", "order already has a delivery crew"));
        }
        Some(StatusInput::State(_)) => false,
    };
    order.status = OrderStatus::settle(delivered, order.delivery_crew);
    let order = save(store, order).await?;
    info!("order {} is now {}", order.id, order.status.as_str());
    Ok(order)
}

/// Flip delivered / not delivered.
pub(crate) async fn toggle_order_status<S: Store>(store: &S, id: OrderId, requester: &Requester) -> Result<Order, ApiError> {
    authorize(Operation::UpdateOrderStatus, requester)?;
    let mut order = scoped_order(store, id, requester).await?;
    order.status = OrderStatus::settle(!order.is_delivered(), order.delivery_crew);
    let order = save(store, order).await?;
    info!("order {} toggled to {}", order.id, order.status.as_str());
    Ok(order)
}

pub(crate) async fn delete_order<S: Store>(store: &S, id: OrderId, requester: &Requester) -> Result<(), ApiError> {
    authorize(Operation::DeleteOrder, requester)?;
    match store.delete_order(id).await? {
        true => {
            info!("order {} deleted", id);
            Ok(())
        }
        false => Err(ApiError::NotFound("order")),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use super::*;
    use crate::server::database::memory::MemoryStore;
    use crate::server::model::cart::AddToCartRequest;
    use crate::server::model::menu_item::MenuItem;
    use crate::server::model::user::User;
    use crate::server::service::{cart, catalog, registry};

    struct Fixture {
        store: MemoryStore,
        manager: Requester,
        alice: User,
        salad: MenuItem,
        lemonade: MenuItem,
    }

    fn as_requester(user: &User) -> Requester {
        Requester::from_user(user.clone())
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let manager = as_requester(&store.add_user("mia", &[Role::Manager]));
        let alice = store.add_user("alice", &[]);
        let mains = store.add_category("Mains");
        let drinks = store.add_category("Drinks");
        let salad = store.add_menu_item("Greek Salad", dec!(12.50), mains.id);
        let lemonade = store.add_menu_item("Lemonade", dec!(5.00), drinks.id);
        Fixture { store, manager, alice, salad, lemonade }
    }

    async fn add(store: &MemoryStore, user: &User, item: &MenuItem, quantity: i32) {
        cart::add_to_cart(store, user.id, AddToCartRequest { menuitem: item.id, quantity })
            .await
            .unwrap();
    }

    /// crew membership is read from the store, so re-resolve after changes
    async fn refreshed(store: &MemoryStore, user: &User) -> Requester {
        Requester::from_user(store.user_by_id(user.id).await.unwrap().unwrap())
    }

    #[test]
    fn draft_sums_exactly() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let lines = (1..=10)
            .map(|i| CartLine {
                id: i,
                user: 1,
                menuitem: i,
                quantity: 1,
                unit_price: dec!(0.10),
                price: dec!(0.10),
            })
            .collect::<Vec<_>>();
        let draft = draft_from_cart(1, &lines, date).unwrap();
        assert_eq!(draft.total, dec!(1.00));
        assert_eq!(draft.items.len(), 10);
        assert!(matches!(draft_from_cart(1, &[], date), Err(ApiError::EmptyCart)));
    }

    #[test]
    fn draft_rejects_total_beyond_column_bound() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let line = |id: i64, price: Decimal| CartLine {
            id,
            user: 1,
            menuitem: id,
            quantity: 999,
            unit_price: dec!(9999.99),
            price,
        };
        let full = [line(1, dec!(9989990.01)), line(2, dec!(9989990.01))];
        assert_eq!(draft_from_cart(1, &full, date).unwrap().total, dec!(19979980.02));

        let over = [line(1, MAX_ORDER_TOTAL), line(2, dec!(0.01))];
        assert!(matches!(
            draft_from_cart(1, &over, date),
            Err(ApiError::Validation { field: "total", .. })
        ));
    }

    #[actix_web::test]
    async fn checkout_snapshots_cart() {
        let f = fixture();
        let alice = as_requester(&f.alice);
        add(&f.store, &f.alice, &f.salad, 2).await;
        add(&f.store, &f.alice, &f.lemonade, 1).await;

        let (order, items) = create_order(&f.store, &alice).await.unwrap();
        assert_eq!(order.total, dec!(30.00));
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.delivery_crew, None);
        assert_eq!(order.date, time::today());
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().map(|i| i.price).sum::<Decimal>(), order.total);
        assert!(cart::list_cart(&f.store, f.alice.id).await.unwrap().is_empty());

        // later price changes leave the snapshot alone
        catalog::update_menu_item(
            &f.store,
            f.salad.id,
            crate::server::model::menu_item::MenuItemPatch { price: Some(dec!(20.00)), ..Default::default() },
        )
        .await
        .unwrap();
        let (_, items) = get_order_items(&f.store, order.id, &alice).await.unwrap();
        let salad_line = items.iter().find(|i| i.menuitem == f.salad.id).unwrap();
        assert_eq!(salad_line.unit_price, dec!(12.50));
        assert_eq!(salad_line.price, dec!(25.00));
    }

    #[actix_web::test]
    async fn empty_cart_creates_nothing() {
        let f = fixture();
        assert!(matches!(
            create_order(&f.store, &as_requester(&f.alice)).await,
            Err(ApiError::EmptyCart)
        ));
        assert_eq!(f.store.order_count(), 0);
        assert!(matches!(
            create_order(&f.store, &Requester::Anonymous).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[actix_web::test]
    async fn order_visibility() {
        let f = fixture();
        let alice = as_requester(&f.alice);
        let eve = f.store.add_user("eve", &[]);
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &alice).await.unwrap();

        assert!(get_order_items(&f.store, order.id, &alice).await.is_ok());
        assert!(get_order_items(&f.store, order.id, &f.manager).await.is_ok());
        assert!(matches!(
            get_order_items(&f.store, order.id, &as_requester(&eve)).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            get_order_items(&f.store, order.id + 100, &alice).await,
            Err(ApiError::NotFound("order"))
        ));

        assert_eq!(list_orders(&f.store, &alice).await.unwrap().len(), 1);
        assert!(list_orders(&f.store, &as_requester(&eve)).await.unwrap().is_empty());
        assert_eq!(list_orders(&f.store, &f.manager).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn assigned_crew_sees_order() {
        let f = fixture();
        let bob = f.store.add_user("bob", &[Role::DeliveryCrew]);
        let dave = f.store.add_user("dave", &[Role::DeliveryCrew]);
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &as_requester(&f.alice)).await.unwrap();

        let assigned = assign_delivery_crew(&f.store, order.id, bob.id, &f.manager).await.unwrap();
        assert_eq!(assigned.status, OrderStatus::Assigned);
        assert_eq!(assigned.delivery_crew, Some(bob.id));

        let bob_orders = list_orders(&f.store, &as_requester(&bob)).await.unwrap();
        assert_eq!(bob_orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![order.id]);
        assert!(list_orders(&f.store, &as_requester(&dave)).await.unwrap().is_empty());
        assert!(get_order_items(&f.store, order.id, &as_requester(&bob)).await.is_ok());
        assert!(matches!(
            get_order_items(&f.store, order.id, &as_requester(&dave)).await,
            Err(ApiError::Forbidden)
        ));
    }

    #[actix_web::test]
    async fn assignment_rules() {
        let f = fixture();
        let bob = f.store.add_user("bob", &[Role::DeliveryCrew]);
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &as_requester(&f.alice)).await.unwrap();

        assert!(matches!(
            assign_delivery_crew(&f.store, order.id, bob.id, &as_requester(&bob)).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            assign_delivery_crew(&f.store, order.id, f.alice.id, &f.manager).await,
            Err(ApiError::Validation { field: "delivery_crew", .. })
        ));
        assert!(matches!(
            assign_delivery_crew(&f.store, order.id, 9_999, &f.manager).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            assign_delivery_crew(&f.store, 9_999, bob.id, &f.manager).await,
            Err(ApiError::NotFound("order"))
        ));
    }

    #[actix_web::test]
    async fn crew_updates_status_only() {
        let f = fixture();
        let bob = f.store.add_user("bob", &[Role::DeliveryCrew]);
        let dave = f.store.add_user("dave", &[Role::DeliveryCrew]);
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &as_requester(&f.alice)).await.unwrap();
        assign_delivery_crew(&f.store, order.id, bob.id, &f.manager).await.unwrap();

        let delivered = UpdateOrderRequest { status: Some(StatusInput::Delivered(true)), delivery_crew: None };
        let updated = update_order_status(&f.store, order.id, delivered, &as_requester(&bob)).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Delivered);

        let reassign = UpdateOrderRequest { status: None, delivery_crew: Some(dave.id) };
        assert!(matches!(
            update_order_status(&f.store, order.id, reassign, &as_requester(&bob)).await,
            Err(ApiError::Forbidden)
        ));

        let other = UpdateOrderRequest { status: Some(StatusInput::Delivered(false)), delivery_crew: None };
        assert!(matches!(
            update_order_status(&f.store, order.id, other, &as_requester(&dave)).await,
            Err(ApiError::Forbidden)
        ));

        let customer = UpdateOrderRequest { status: Some(StatusInput::Delivered(true)), delivery_crew: None };
        assert!(matches!(
            update_order_status(&f.store, order.id, customer, &as_requester(&f.alice)).await,
            Err(ApiError::Forbidden)
        ));
    }

    #[actix_web::test]
    async fn manager_sets_status_and_crew_together() {
        let f = fixture();
        let bob = f.store.add_user("bob", &[Role::DeliveryCrew]);
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &as_requester(&f.alice)).await.unwrap();

        let req = UpdateOrderRequest {
            status: Some(StatusInput::State(OrderStatus::Assigned)),
            delivery_crew: None,
        };
        assert!(matches!(
            update_order_status(&f.store, order.id, req, &f.manager).await,
            Err(ApiError::Validation { field: "status", .. })
        ));

        let req = UpdateOrderRequest {
            status: Some(StatusInput::State(OrderStatus::Delivered)),
            delivery_crew: Some(bob.id),
        };
        let updated = update_order_status(&f.store, order.id, req, &f.manager).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Delivered);
        assert_eq!(updated.delivery_crew, Some(bob.id));

        let toggled = toggle_order_status(&f.store, order.id, &f.manager).await.unwrap();
        assert_eq!(toggled.status, OrderStatus::Assigned);
        let toggled = toggle_order_status(&f.store, order.id, &as_requester(&bob)).await.unwrap();
        assert_eq!(toggled.status, OrderStatus::Delivered);
    }

    #[actix_web::test]
    async fn removed_crew_loses_visibility() {
        let f = fixture();
        let bob = f.store.add_user("bob", &[Role::DeliveryCrew]);
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &as_requester(&f.alice)).await.unwrap();
        assign_delivery_crew(&f.store, order.id, bob.id, &f.manager).await.unwrap();
        assert_eq!(list_orders(&f.store, &refreshed(&f.store, &bob).await).await.unwrap().len(), 1);

        registry::remove_user_from_role(&f.store, bob.id, Role::DeliveryCrew).await.unwrap();
        assert!(list_orders(&f.store, &refreshed(&f.store, &bob).await).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn delete_cascades_items() {
        let f = fixture();
        add(&f.store, &f.alice, &f.salad, 1).await;
        let (order, _) = create_order(&f.store, &as_requester(&f.alice)).await.unwrap();

        assert!(matches!(
            delete_order(&f.store, order.id, &as_requester(&f.alice)).await,
            Err(ApiError::Forbidden)
        ));
        // menu items referenced by an order cannot go away
        assert!(matches!(
            catalog::delete_menu_item(&f.store, f.salad.id).await,
            Err(ApiError::Conflict(_))
        ));

        delete_order(&f.store, order.id, &f.manager).await.unwrap();
        assert!(f.store.order_items(order.id).await.unwrap().is_empty());
        assert!(matches!(
            delete_order(&f.store, order.id, &f.manager).await,
            Err(ApiError::NotFound("order"))
        ));
        catalog::delete_menu_item(&f.store, f.salad.id).await.unwrap();
    }

    #[actix_web::test]
    async fn every_checkout_matches_its_cart() {
        let f = fixture();
        for n in 1..=5 {
            let user = f.store.add_user(&format!("guest{n}"), &[]);
            for q in 1..=n {
                let item = f.store.add_menu_item(&format!("Dish {n}-{q}"), Decimal::new(105 * q as i64, 2), f.salad.category);
                add(&f.store, &user, &item, q).await;
            }
            let expected = cart::list_cart(&f.store, user.id).await.unwrap().iter().map(|l| l.price).sum::<Decimal>();
            let (order, items) = create_order(&f.store, &as_requester(&user)).await.unwrap();
            assert_eq!(items.len(), n as usize);
            assert_eq!(order.total, expected);
            assert_eq!(items.iter().map(|i| i.price).sum::<Decimal>(), order.total);
            assert!(cart::list_cart(&f.store, user.id).await.unwrap().is_empty());
        }
    }
}
