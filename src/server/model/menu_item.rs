use std::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::server::model::category::CategoryId;
use crate::server::model::Pagination;

pub(crate) type MenuItemId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MenuItem {
    pub id: MenuItemId,
    pub title: String,
    pub price: Decimal,
    pub featured: bool,
    pub category: CategoryId,
}

/// Full set of writable fields, used by POST and PUT.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MenuItemInput {
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub featured: bool,
    pub category: CategoryId,
}

/// Partial update, used by PATCH.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MenuItemPatch {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub featured: Option<bool>,
    pub category: Option<CategoryId>,
}

impl MenuItemPatch {
    /// overlay the provided fields on an existing item
    pub fn apply(self, item: &MenuItem) -> MenuItemInput {
        MenuItemInput {
            title: self.title.unwrap_or_else(|| item.title.clone()),
            price: self.price.unwrap_or(item.price),
            featured: self.featured.unwrap_or(item.featured),
            category: self.category.unwrap_or(item.category),
        }
    }
}

impl From<MenuItemInput> for MenuItemPatch {
    fn from(input: MenuItemInput) -> Self {
        Self {
            title: Some(input.title),
            price: Some(input.price),
            featured: Some(input.featured),
            category: Some(input.category),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortField {
    Price,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ordering {
    pub field: SortField,
    pub descending: bool,
}

impl FromStr for Ordering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "price" => SortField::Price,
            "category" => SortField::Category,
            other => return Err(format!("cannot order by {other}")),
        };
        Ok(Self { field, descending })
    }
}

/// Raw query string of `GET /menu-items`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MenuItemParams {
    pub price: Option<Decimal>,
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub perpage: Option<u32>,
}

/// Validated listing query handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MenuItemQuery {
    pub price: Option<Decimal>,
    pub category: Option<CategoryId>,
    /// lowercase needle matched against item title and category title
    pub search: Option<String>,
    pub ordering: Option<Ordering>,
    pub pagination: Pagination,
}
