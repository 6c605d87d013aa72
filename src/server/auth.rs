use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::{HeaderValue, AUTHORIZATION};
use actix_web::{FromRequest, HttpRequest};
use log::warn;

use crate::server::controller::error::ApiError;
use crate::server::database::Store;
use crate::server::policy::{authorize, Operation, Requester};

/// Token carried by the `Authorization` header, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials(Option<String>);

impl Credentials {
    fn parse(header: Option<&HeaderValue>) -> Result<Self, ApiError> {
        let Some(header) = header else {
            return Ok(Credentials(None));
        };
        let value = header.to_str().map_err(|_| ApiError::Unauthenticated)?;
        match value.trim().split_once(' ') {
            Some((scheme, key))
                if (scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer"))
                    && !key.trim().is_empty() =>
            {
                Ok(Credentials(Some(key.trim().to_string())))
            }
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

impl FromRequest for Credentials {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Credentials::parse(req.headers().get(AUTHORIZATION)))
    }
}

/// Resolve the caller. No credentials means anonymous, unknown ones are rejected.
pub(crate) async fn authenticate<S: Store>(store: &S, credentials: &Credentials) -> Result<Requester, ApiError> {
    let Some(key) = &credentials.0 else {
        return Ok(Requester::Anonymous);
    };
    match store.user_by_token(key).await? {
        Some(user) => Ok(Requester::from_user(user)),
        None => {
            warn!("rejected unknown auth token");
            Err(ApiError::Unauthenticated)
        }
    }
}

/// authenticate, then check the operation against the policy table
pub(crate) async fn gate<S: Store>(
    store: &S,
    credentials: &Credentials,
    operation: Operation,
) -> Result<Requester, ApiError> {
    let requester = authenticate(store, credentials).await?;
    authorize(operation, &requester)?;
    Ok(requester)
}
