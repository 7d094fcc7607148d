use crate::config::Config;
use crate::error::AppError;
use crate::models::{conversation_id, ConversationSummary, Message, SendMessageRequest};
use crate::services::AuthUser;
use crate::state::AppState;
use actix_web::{delete, get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct OtherUserView {
    pub id: String,
    pub name: String,
    pub is_online: bool,
}

/// Conversation list entry, annotated with the other side's presence
#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub conversation_id: String,
    pub other_user: OtherUserView,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: u64,
}

impl ConversationView {
    fn new(summary: ConversationSummary, is_online: bool) -> Self {
        Self {
            conversation_id: summary.conversation_id,
            other_user: OtherUserView {
                id: summary.other_user.id,
                name: summary.other_user.name,
                is_online,
            },
            last_message: summary.last_message,
            last_message_time: summary.last_message_time,
            unread_count: summary.unread_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub other_user_online: bool,
}

// ==================== Messaging Endpoints ====================

/// Send a message; pushed in real time when the receiver is online
/// POST /chat/send
#[post("/chat/send")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let delivery = state.relay.send_as(&user, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": delivery.message,
        "delivered_realtime": delivery.delivered_realtime,
    })))
}

/// GET /chat/conversations
#[get("/chat/conversations")]
pub async fn get_conversations(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let summaries = state.store.conversations_for(&user.identity).await;

    let mut views = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let online = state.registry.is_online(&summary.other_user.id).await;
        views.push(ConversationView::new(summary, online));
    }

    Ok(HttpResponse::Ok().json(views))
}

/// Chat history with one user. Reading it acknowledges the conversation.
/// GET /chat/history/{other_id}?limit=
#[get("/chat/history/{other_id}")]
pub async fn get_history(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let other_id = path.into_inner();
    let limit = query
        .limit
        .map(Config::clamp_history_limit)
        .unwrap_or(state.config.history_limit);

    let messages = state.store.history(&user.identity, &other_id, limit).await;
    state
        .store
        .mark_read(&user.identity, &conversation_id(&user.identity, &other_id))
        .await;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        messages,
        other_user_online: state.registry.is_online(&other_id).await,
    }))
}

/// POST /chat/conversations/{conversation_id}/read
#[post("/chat/conversations/{conversation_id}/read")]
pub async fn mark_conversation_read(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = path.into_inner();
    let marked = state.store.mark_read(&user.identity, &conversation_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "conversation_id": conversation_id,
        "marked_read": marked,
    })))
}

/// GET /chat/unread-count
#[get("/chat/unread-count")]
pub async fn get_unread_count(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let unread_count = state.store.unread_total(&user.identity).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "unread_count": unread_count })))
}

/// GET /chat/search?q=
#[get("/chat/search")]
pub async fn search_messages(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::BadRequest("search query is empty".into()));
    }

    let messages = state.store.search(&user.identity, q).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": messages.len(),
        "messages": messages,
    })))
}

/// DELETE /chat/conversation/{other_id}
#[delete("/chat/conversation/{other_id}")]
pub async fn delete_conversation(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let deleted = state
        .store
        .delete_conversation(&user.identity, &path.into_inner())
        .await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": deleted })))
}

// ==================== Presence Endpoints ====================

/// GET /chat/online-status/{user_id}
#[get("/chat/online-status/{user_id}")]
pub async fn get_online_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let is_online = state.registry.is_online(&user_id).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_id": user_id,
        "is_online": is_online,
    })))
}

/// GET /chat/online
#[get("/chat/online")]
pub async fn get_online_users(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let users = state.registry.list_online().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": users.len(),
        "users": users,
    })))
}
