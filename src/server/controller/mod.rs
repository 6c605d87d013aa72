//! HTTP handlers. Each one resolves the requester, gates the operation and
//! delegates to the matching service.

pub(crate) mod cart;
pub(crate) mod catalog;
pub(crate) mod error;
pub(crate) mod groups;
pub(crate) mod orders;

use actix_web::web;
use serde::de::DeserializeOwned;

use crate::server::controller::error::ApiError;

/// Decode a JSON body. Handlers read bodies as raw bytes and call this only
/// once the request passed the policy gate.
pub(crate) fn json_body<T: DeserializeOwned>(body: &web::Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::validation("body", e.to_string()))
}
