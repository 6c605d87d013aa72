use actix_web::{web, HttpResponse};

use crate::server::auth::{gate, Credentials};
use crate::server::controller::error::ApiError;
use crate::server::controller::json_body;
use crate::server::database::Store;
use crate::server::model::category::NewCategory;
use crate::server::model::menu_item::{MenuItemId, MenuItemInput, MenuItemParams, MenuItemPatch};
use crate::server::policy::Operation;
use crate::server::service::catalog;

/// list categories
pub(crate) async fn list_categories<S: Store>(store: web::Data<S>, credentials: Credentials) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::ListCategories).await?;
    let categories = catalog::list_categories(store.get_ref()).await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// create a category
pub(crate) async fn create_category<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::CreateCategory).await?;
    let category = catalog::create_category(store.get_ref(), json_body::<NewCategory>(&body)?).await?;
    Ok(HttpResponse::Created().json(category))
}

/// list menu items, filtered, searched, ordered and paginated by query params
pub(crate) async fn list_menu_items<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    params: web::Query<MenuItemParams>,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::ListMenuItems).await?;
    let page = catalog::list_menu_items(store.get_ref(), params.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub(crate) async fn create_menu_item<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::CreateMenuItem).await?;
    let item = catalog::create_menu_item(store.get_ref(), json_body::<MenuItemInput>(&body)?).await?;
    Ok(HttpResponse::Created().json(item))
}

pub(crate) async fn get_menu_item<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<MenuItemId>,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::ViewMenuItem).await?;
    let item = catalog::get_menu_item(store.get_ref(), id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

/// PUT, every field is required
pub(crate) async fn replace_menu_item<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<MenuItemId>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::UpdateMenuItem).await?;
    let input = json_body::<MenuItemInput>(&body)?;
    let item = catalog::update_menu_item(store.get_ref(), id.into_inner(), input.into()).await?;
    Ok(HttpResponse::Ok().json(item))
}

/// PATCH, only the provided fields change
pub(crate) async fn patch_menu_item<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<MenuItemId>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::UpdateMenuItem).await?;
    let patch = json_body::<MenuItemPatch>(&body)?;
    let item = catalog::update_menu_item(store.get_ref(), id.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(item))
}

pub(crate) async fn delete_menu_item<S: Store>(
    store: web::Data<S>,
    credentials: Credentials,
    id: web::Path<MenuItemId>,
) -> Result<HttpResponse, ApiError> {
    gate(store.get_ref(), &credentials, Operation::DeleteMenuItem).await?;
    catalog::delete_menu_item(store.get_ref(), id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
