//! Categories and menu items.

use log::info;
use rust_decimal::Decimal;
use crate::server::controller::error::ApiError;
use crate::server::database::Store;
use crate::server::model::category::{Category, NewCategory};
use crate::server::model::menu_item::{
    MenuItem, MenuItemId, MenuItemInput, MenuItemParams, MenuItemPatch, MenuItemQuery, Ordering,
};
use crate::server::model::{Page, Pagination};

const MAX_TITLE_LEN: usize = 255;
/// NUMERIC(6,2) upper bound
const MAX_PRICE: Decimal = Decimal::from_parts(999_999, 0, 0, false, 2);

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("title", "this field may not be blank"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(
            "title",
            format!("ensure this field has no more than {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title.to_string())
}

fn validate_price(price: Decimal) -> Result<Decimal, ApiError> {
    if price <= Decimal::ZERO {
        return Err(ApiError::validation("price", "must be a positive amount"));
    }
    if price.round_dp(2) != price {
        return Err(ApiError::validation("price", "ensure there are no more than 2 decimal places"));
    }
    if price > MAX_PRICE {
        return Err(ApiError::validation("price", format!("ensure this value is at most {MAX_PRICE}")));
    }
    Ok(price)
}

/// validate fields and make sure the category exists
async fn validate_menu_item<S: Store>(store: &S, input: MenuItemInput) -> Result<MenuItemInput, ApiError> {
    let input = MenuItemInput {
        title: validate_title(&input.title)?,
        price: validate_price(input.price)?,
        ..input
    };
    store
        .category(input.category)
        .await?
        .ok_or(ApiError::NotFound("category"))?;
    Ok(input)
}

pub(crate) async fn list_categories<S: Store>(store: &S) -> Result<Vec<Category>, ApiError> {
    Ok(store.categories().await?)
}

pub(crate) async fn create_category<S: Store>(store: &S, new: NewCategory) -> Result<Category, ApiError> {
    let title = validate_title(&new.title)?;
    let category = store.insert_category(&title).await?;
    info!("category {} created", category.id);
    Ok(category)
}

pub(crate) async fn list_menu_items<S: Store>(store: &S, params: MenuItemParams) -> Result<Page<MenuItem>, ApiError> {
    let ordering = params
        .ordering
        .as_deref()
        .map(str::parse::<Ordering>)
        .transpose()
        .map_err(|e| ApiError::validation("ordering", e))?;
    let search = params
        .search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let query = MenuItemQuery {
        price: params.price,
        category: params.category,
        search,
        ordering,
        pagination: Pagination::new(params.page, params.perpage),
    };
    let (count, results) = store.menu_items(&query).await?;
    Ok(Page {
        count,
        page: query.pagination.page,
        perpage: query.pagination.perpage,
        results,
    })
}

pub(crate) async fn get_menu_item<S: Store>(store: &S, id: MenuItemId) -> Result<MenuItem, ApiError> {
    store.menu_item(id).await?.ok_or(ApiError::NotFound("menu item"))
}

pub(crate) async fn create_menu_item<S: Store>(store: &S, input: MenuItemInput) -> Result<MenuItem, ApiError> {
    let input = validate_menu_item(store, input).await?;
    let item = store.insert_menu_item(&input).await?;
    info!("menu item {} created", item.id);
    Ok(item)
}

/// Apply a full (PUT) or partial (PATCH) update.
pub(crate) async fn update_menu_item<S: Store>(
    store: &S,
    id: MenuItemId,
    changes: MenuItemPatch,
) -> Result<MenuItem, ApiError> {
    let current = get_menu_item(store, id).await?;
    let input = validate_menu_item(store, changes.apply(&current)).await?;
    let item = store
        .update_menu_item(id, &input)
        .await?
        .ok_or(ApiError::NotFound("menu item"))?;
    info!("menu item {} updated", item.id);
    Ok(item)
}

pub(crate) async fn delete_menu_item<S: Store>(store: &S, id: MenuItemId) -> Result<(), ApiError> {
    match store.delete_menu_item(id).await? {
        true => {
            info!("menu item {} deleted", id);
            Ok(())
        }
        false => Err(ApiError::NotFound("menu item")),
    }
}
