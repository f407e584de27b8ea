use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::{debug, warn};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::ApiError;

/// `X-API-Key` guard for mutating wallet routes.
///
/// When `server.api_key` is not configured every request is let through.
pub struct ApiKey(pub Option<String>);

impl FromRequest for ApiKey {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(config) = req.app_data::<web::Data<Arc<Config>>>() else {
            warn!("Config not found in app data");
            return ready(Err(ApiError::InternalError));
        };

        let header_key = req
            .headers()
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let result = match (&config.server.api_key, header_key) {
            (None, header_key) => {
                debug!("API key not configured, allowing access");
                Ok(ApiKey(header_key))
            }
            (Some(expected), Some(provided)) if *expected == provided => Ok(ApiKey(Some(provided))),
            (Some(_), Some(_)) => {
                warn!("Invalid API key provided");
                Err(ApiError::Unauthorized("Invalid API key".to_string()))
            }
            (Some(_), None) => {
                warn!("API key required but not provided");
                Err(ApiError::Unauthorized("API key required".to_string()))
            }
        };

        ready(result)
    }
}
