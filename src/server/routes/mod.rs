//! URL table of the `/api` surface.

use actix_web::web;

use crate::server::controller::error::ApiError;
use crate::server::controller::{cart, catalog, groups, orders};
use crate::server::database::Store;

/// Register every endpoint for a store implementation.
pub(crate) fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    // request bodies are decoded by the handlers after gating, see `controller::json_body`
    cfg.app_data(web::QueryConfig::default().error_handler(|e, _| ApiError::validation("query", e.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|_, _| ApiError::NotFound("resource").into()))
        .service(
            web::scope("/api")
                .service(
                    web::resource("/categories")
                        .route(web::get().to(catalog::list_categories::<S>))
                        .route(web::post().to(catalog::create_category::<S>)),
                )
                .service(
                    web::resource("/menu-items")
                        .route(web::get().to(catalog::list_menu_items::<S>))
                        .route(web::post().to(catalog::create_menu_item::<S>)),
                )
                .service(
                    web::resource("/menu-items/{id}")
                        .route(web::get().to(catalog::get_menu_item::<S>))
                        .route(web::put().to(catalog::replace_menu_item::<S>))
                        .route(web::patch().to(catalog::patch_menu_item::<S>))
                        .route(web::delete().to(catalog::delete_menu_item::<S>)),
                )
                .service(
                    web::resource("/groups/{group}/users")
                        .route(web::get().to(groups::list_members::<S>))
                        .route(web::post().to(groups::add_member::<S>)),
                )
                .service(
                    web::resource("/groups/{group}/users/{id}")
                        .route(web::delete().to(groups::remove_member::<S>)),
                )
                .service(
                    web::resource("/cart/menu-items")
                        .route(web::get().to(cart::list_cart::<S>))
                        .route(web::post().to(cart::add_to_cart::<S>))
                        .route(web::delete().to(cart::clear_cart::<S>)),
                )
                .service(
                    web::resource("/orders")
                        .route(web::get().to(orders::list_orders::<S>))
                        .route(web::post().to(orders::create_order::<S>)),
                )
                .service(
                    web::resource("/orders/{id}")
                        .route(web::get().to(orders::get_order::<S>))
                        .route(web::put().to(orders::assign_crew::<S>))
                        .route(web::patch().to(orders::update_order::<S>))
                        .route(web::delete().to(orders::delete_order::<S>)),
                ),
        );
}
