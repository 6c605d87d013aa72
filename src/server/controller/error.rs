use actix_web::{error, HttpResponse};
use actix_web::http::StatusCode;
use derive_more::{Display, Error};
use log::error;
use serde::Serialize;
use crate::server::database::StoreError;

/// Every failure that may cross the HTTP boundary.
#[derive(Debug, Display, Error)]
pub(crate) enum ApiError {
    #[display("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[display("authentication credentials were not provided or are invalid")]
    Unauthenticated,
    #[display("you do not have permission to perform this action")]
    Forbidden,
    #[display("{_0} not found")]
    NotFound(#[error(not(source))] &'static str),
    #[display("cart is empty")]
    EmptyCart,
    #[display("conflict: {_0}")]
    Conflict(#[error(not(source))] String),
    #[display("server is busy")]
    ServerIsBusy,
    #[display("timeout occurred")]
    Timeout,
    #[display("internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation { field, message: message.into() }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::EmptyCart => "empty_cart",
            ApiError::Conflict(_) => "conflict",
            ApiError::ServerIsBusy => "server_busy",
            ApiError::Timeout => "timeout",
            ApiError::Internal => "internal_error",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Db(e) => {
                error!("data store failure, {}", e);
                ApiError::Internal
            }
            StoreError::Busy => ApiError::ServerIsBusy,
            StoreError::Timeout => ApiError::Timeout,
            StoreError::Conflict(reason) => ApiError::Conflict(reason),
            StoreError::Constraint { field, message } => ApiError::Validation { field, message },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::Validation { .. } | ApiError::EmptyCart => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServerIsBusy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let field = match self {
            ApiError::Validation { field, .. } => Some(*field),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code(),
            message: self.to_string(),
            field,
        })
    }
}
