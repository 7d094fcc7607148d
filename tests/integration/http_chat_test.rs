use actix_web::{http::StatusCode, test, web, App};
use marketplace_chat_service::routes;
use serde_json::{json, Value};

use super::support::{fixture, CONSUMER, FARMER};

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

macro_rules! chat_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(routes::configure),
        )
        .await
    };
}

#[actix_rt::test]
async fn send_then_read_clears_unread() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/chat/send")
        .insert_header(bearer(&fx.farmer_token))
        .set_json(json!({
            "receiver_id": CONSUMER,
            "receiver_name": "Priya Sharma",
            "body": "Fresh Tomatoes ready for pickup"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["delivered_realtime"], false);
    assert_eq!(body["message"]["message_id"], "MSG-000001");
    assert_eq!(body["message"]["sender_name"], "Rajan Singh");

    let req = test::TestRequest::get()
        .uri("/chat/unread-count")
        .insert_header(bearer(&fx.consumer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["unread_count"], 1);

    let req = test::TestRequest::get()
        .uri("/chat/conversations")
        .insert_header(bearer(&fx.consumer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["other_user"]["id"], FARMER);
    assert_eq!(conversations[0]["other_user"]["is_online"], false);
    assert_eq!(conversations[0]["unread_count"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/chat/history/{FARMER}"))
        .insert_header(bearer(&fx.consumer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["other_user_online"], false);

    let req = test::TestRequest::get()
        .uri("/chat/unread-count")
        .insert_header(bearer(&fx.consumer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["unread_count"], 0);
}

#[actix_rt::test]
async fn explicit_acknowledgment_and_search() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    for text in ["Basmati rice 50kg", "Any organic wheat?"] {
        let req = test::TestRequest::post()
            .uri("/chat/send")
            .insert_header(bearer(&fx.consumer_token))
            .set_json(json!({ "receiver_id": FARMER, "receiver_name": "Rajan Singh", "body": text }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/chat/search?q=RICE")
        .insert_header(bearer(&fx.farmer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["messages"][0]["body"], "Basmati rice 50kg");

    let conversation_id = format!("{CONSUMER}___{FARMER}");
    let req = test::TestRequest::post()
        .uri(&format!("/chat/conversations/{conversation_id}/read"))
        .insert_header(bearer(&fx.farmer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["marked_read"], 2);

    let req = test::TestRequest::get()
        .uri("/chat/unread-count")
        .insert_header(bearer(&fx.farmer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["unread_count"], 0);
}

#[actix_rt::test]
async fn rejects_missing_and_invalid_tokens() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    let req = test::TestRequest::get().uri("/chat/conversations").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "TOKEN_MISSING");

    let req = test::TestRequest::post()
        .uri("/chat/send")
        .insert_header(bearer("not.a.token"))
        .set_json(json!({ "receiver_id": FARMER, "receiver_name": "x", "body": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[actix_rt::test]
async fn rejects_invalid_sends_and_empty_search() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    let bad = [
        json!({ "receiver_id": CONSUMER, "receiver_name": "Priya Sharma", "body": "   " }),
        json!({ "receiver_id": FARMER, "receiver_name": "Rajan Singh", "body": "note to self" }),
    ];
    for payload in bad {
        let req = test::TestRequest::post()
            .uri("/chat/send")
            .insert_header(bearer(&fx.farmer_token))
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::get()
        .uri("/chat/search?q=")
        .insert_header(bearer(&fx.farmer_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn delete_conversation_reports_existence() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/chat/send")
        .insert_header(bearer(&fx.farmer_token))
        .set_json(json!({ "receiver_id": CONSUMER, "receiver_name": "Priya Sharma", "body": "hello" }))
        .to_request();
    test::call_service(&app, req).await;

    for expected in [true, false] {
        let req = test::TestRequest::delete()
            .uri(&format!("/chat/conversation/{FARMER}"))
            .insert_header(bearer(&fx.consumer_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], expected);
    }

    let req = test::TestRequest::get()
        .uri("/chat/conversations")
        .insert_header(bearer(&fx.farmer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[actix_rt::test]
async fn presence_endpoints_are_public() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    let req = test::TestRequest::get()
        .uri(&format!("/chat/online-status/{FARMER}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_online"], false);

    let (_id, _rx) = fx.state.registry.register(FARMER).await;

    let req = test::TestRequest::get().uri("/chat/online").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["users"][0], FARMER);
}

#[actix_rt::test]
async fn health_reports_corrupt_documents() {
    let fx = fixture().await;
    let app = chat_app!(fx.state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["messages"], 0);

    std::fs::write(fx.dir.path().join("chat_messages.json"), b"[{\"broken\":").unwrap();

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
