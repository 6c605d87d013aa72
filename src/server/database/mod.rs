//! data store abstraction and its implementations

pub(crate) mod connection;
#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod pool;
pub(crate) mod pool_config;
pub(crate) mod postgres;
mod store;

use derive_more::{Display, Error};
use log::warn;
use tokio_postgres::error::SqlState;

pub(crate) use store::Store;

#[derive(Debug, Display, Error)]
pub(crate) enum StoreError {
    #[display("database error: {_0}")]
    Db(tokio_postgres::Error),
    #[display("no connection available")]
    Busy,
    #[display("query timed out")]
    Timeout,
    #[display("conflict: {_0}")]
    Conflict(#[error(not(source))] String),
    #[display("{field}: {message}")]
    Constraint { field: &'static str, message: String },
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        let Some(code) = e.code() else {
            return StoreError::Db(e);
        };
        let constraint = e
            .as_db_error()
            .and_then(|db| db.constraint())
            .unwrap_or_default()
            .to_string();
        if *code == SqlState::FOREIGN_KEY_VIOLATION || *code == SqlState::UNIQUE_VIOLATION {
            warn!("constraint {} violated, {}", constraint, e);
            StoreError::Conflict(conflict_reason(code, &constraint).to_string())
        } else if *code == SqlState::T_R_SERIALIZATION_FAILURE || *code == SqlState::T_R_DEADLOCK_DETECTED {
            StoreError::Conflict("concurrent update, please retry".to_string())
        } else if *code == SqlState::CHECK_VIOLATION && constraint.contains("quantity") {
            StoreError::Constraint {
                field: "quantity",
                message: "quantity is out of range".to_string(),
            }
        } else if *code == SqlState::NUMERIC_VALUE_OUT_OF_RANGE {
            warn!("numeric overflow, {}", e);
            StoreError::Constraint {
                field: "quantity",
                message: "line amount is out of range".to_string(),
            }
        } else {
            StoreError::Db(e)
        }
    }
}

/// What a violated foreign key or unique constraint means to the caller.
fn conflict_reason(code: &SqlState, constraint: &str) -> &'static str {
    if *code == SqlState::FOREIGN_KEY_VIOLATION {
        match constraint {
            "order_item_menu_item_id_fkey" => "menu item is referenced by existing orders",
            "menu_item_category_id_fkey" => "category is missing or still has menu items",
            "cart_line_menu_item_id_fkey" => "menu item no longer exists",
            _ => "a referenced record no longer exists",
        }
    } else {
        match constraint {
            "cart_line_user_menu_item_key" => "menu item is already in the cart",
            "app_user_username_key" => "username is already taken",
            _ => "record already exists",
        }
    }
}
