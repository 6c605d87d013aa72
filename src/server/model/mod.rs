use serde::Serialize;

pub(crate) mod cart;
pub(crate) mod category;
pub(crate) mod config;
pub(crate) mod menu_item;
pub(crate) mod order;
pub(crate) mod user;

/// Page-number pagination window resolved from `page`/`perpage` query params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub perpage: u32,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: u32 = 5;
    pub const MAX_PER_PAGE: u32 = 20;

    /// Out-of-range values are clamped rather than rejected.
    pub fn new(page: Option<u32>, perpage: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            perpage: perpage
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.perpage as usize
    }

    pub fn limit(&self) -> usize {
        self.perpage as usize
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Page<T> {
    pub count: u64,
    pub page: u32,
    pub perpage: u32,
    pub results: Vec<T>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
