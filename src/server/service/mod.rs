//! domain operations, called by the controllers once the request is gated

pub(crate) mod cart;
pub(crate) mod catalog;
pub(crate) mod order;
pub(crate) mod registry;
