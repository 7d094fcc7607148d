pub mod chat;
pub mod health;
pub mod wsroute;

use actix_web::web;

/// Register every HTTP and WebSocket route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(chat::send_message)
        .service(chat::get_conversations)
        .service(chat::get_history)
        .service(chat::mark_conversation_read)
        .service(chat::get_unread_count)
        .service(chat::search_messages)
        .service(chat::get_online_status)
        .service(chat::get_online_users)
        .service(chat::delete_conversation)
        .service(wsroute::ws_handler)
        .service(health::health_check);
}
