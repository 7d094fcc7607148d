use crate::error::AppError;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};

/// Liveness plus a full read of both chat documents.
/// An unreadable document turns this into a 503.
#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = state.store.verify().await.map_err(|e| {
        tracing::error!(error = %e, "health check failed");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "messages": stats.messages,
        "conversations": stats.conversations,
        "online_users": state.registry.online_count().await,
    })))
}
