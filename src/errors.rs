use actix_web::{error::ResponseError, HttpResponse};
use derive_more::Display;
use serde_json::json;

/// Errors raised by the chain providers, the cache layer and the wallet services.
///
/// The type is `Clone` because a single in-flight fetch hands the same outcome
/// to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for WalletError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            WalletError::UpstreamTimeout(error.to_string())
        } else {
            WalletError::Upstream(error.to_string())
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::Serialization(error.to_string())
    }
}

impl From<mongodb::error::Error> for WalletError {
    fn from(error: mongodb::error::Error) -> Self {
        log::error!("MongoDB error: {}", error);
        WalletError::Store(error.to_string())
    }
}

#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "Internal server error")]
    InternalError,

    #[display(fmt = "Bad request: {}", _0)]
    BadRequest(String),

    #[display(fmt = "Not found: {}", _0)]
    NotFound(String),

    #[display(fmt = "Database error: {}", _0)]
    DatabaseError(String),

    #[display(fmt = "Unauthorized: {}", _0)]
    Unauthorized(String),

    #[display(fmt = "Service unavailable: {}", _0)]
    ServiceUnavailable(String),

    #[display(fmt = "Bad gateway: {}", _0)]
    BadGateway(String),

    #[display(fmt = "Gateway timeout: {}", _0)]
    GatewayTimeout(String),
}

impl From<WalletError> for ApiError {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::InvalidAddress(_) | WalletError::InvalidInput(_) => {
                ApiError::BadRequest(error.to_string())
            }
            WalletError::ProviderUnavailable(message) => ApiError::ServiceUnavailable(message),
            WalletError::UpstreamTimeout(message) => ApiError::GatewayTimeout(message),
            WalletError::Upstream(message) | WalletError::InvalidAmount(message) => {
                ApiError::BadGateway(message)
            }
            WalletError::Store(message) => ApiError::DatabaseError(message),
            WalletError::Serialization(message) => {
                log::error!("Serialization error: {}", message);
                ApiError::InternalError
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::InternalError => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })),
            ApiError::BadRequest(ref message) => HttpResponse::BadRequest().json(json!({
                "error": message
            })),
            ApiError::NotFound(ref message) => HttpResponse::NotFound().json(json!({
                "error": message
            })),
            ApiError::DatabaseError(ref message) => {
                HttpResponse::InternalServerError().json(json!({
                    "error": format!("Database error: {}", message)
                }))
            }
            ApiError::Unauthorized(ref message) => HttpResponse::Unauthorized().json(json!({
                "error": message
            })),
            ApiError::ServiceUnavailable(ref message) => {
                HttpResponse::ServiceUnavailable().json(json!({
                    "error": message
                }))
            }
            ApiError::BadGateway(ref message) => HttpResponse::BadGateway().json(json!({
                "error": message
            })),
            ApiError::GatewayTimeout(ref message) => HttpResponse::GatewayTimeout().json(json!({
                "error": message
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_wallet_error_maps_to_status() {
        let cases = [
            (WalletError::InvalidAddress("x".into()), StatusCode::BAD_REQUEST),
            (WalletError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                WalletError::ProviderUnavailable("no key".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (WalletError::UpstreamTimeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (WalletError::Upstream("500".into()), StatusCode::BAD_GATEWAY),
            (WalletError::Store("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            let api_error: ApiError = error.into();
            assert_eq!(api_error.error_response().status(), status);
        }
    }
}
