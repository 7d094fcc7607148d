//! Request guards that resolve the caller before a handler runs.
//! A handler taking [`AuthUser`] cannot be reached without a valid token.

use std::future::Future;
use std::pin::Pin;

use crate::error::AppError;
use crate::services::AuthUser;
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, Error, FromRequest, HttpRequest};

/// Bearer token from the `Authorization` header, if present.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(AppError::MissingToken)?;
            let state = state.ok_or_else(|| {
                tracing::error!("application state not configured");
                AppError::Internal
            })?;
            Ok(state.relay.authenticate(&token).await?)
        })
    }
}
