use serde::{Deserialize, Serialize};

pub(crate) type CategoryId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Category {
    pub id: CategoryId,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewCategory {
    pub title: String,
}
