use actix_web::{http::StatusCode, test, App};
use feed_server::audit::AuditLevel;
use serde_json::json;
use std::net::SocketAddr;

mod common;
use common::{PASSWORD, USERNAME};

macro_rules! init_app {
    ($state:expr) => {{
        let state = $state.clone();
        test::init_service(App::new().configure(move |cfg| feed_server::configure(cfg, state))).await
    }};
}

fn login_request(username: &str, password: &str, peer: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/login")
        .peer_addr(peer.parse::<SocketAddr>().unwrap())
        .set_json(json!({ "username": username, "password": password }))
}

#[actix_web::test]
async fn test_login_returns_verifiable_token() {
    let (state, audit) = common::test_state().await;
    let app = init_app!(state);

    let resp = login_request(USERNAME, PASSWORD, "10.0.0.1:5000")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], USERNAME);

    let identity = state
        .tokens
        .verify(body["token"].as_str().unwrap())
        .expect("issued token should verify");
    assert_eq!(identity.username, USERNAME);

    assert_eq!(
        audit.messages(AuditLevel::Activity),
        vec![format!("Login successful for: {}", USERNAME)]
    );
}

#[actix_web::test]
async fn test_invalid_login_is_generic() {
    let (state, audit) = common::test_state().await;
    let app = init_app!(state);

    let wrong_password = login_request(USERNAME, "looking-glass", "10.0.0.1:5000")
        .send_request(&app)
        .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password: serde_json::Value = test::read_body_json(wrong_password).await;

    let unknown_user = login_request("nobody", PASSWORD, "10.0.0.2:5000")
        .send_request(&app)
        .await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user: serde_json::Value = test::read_body_json(unknown_user).await;

    // Nothing distinguishes a bad password from a missing account.
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["error"]["message"], "Invalid credentials");

    let activity = audit.messages(AuditLevel::Activity);
    assert!(activity.contains(&format!("Failed login for: {}", USERNAME)));
    assert!(activity.iter().all(|m| !m.contains("looking-glass")));
}

#[actix_web::test]
async fn test_sixth_attempt_is_throttled_even_with_valid_credentials() {
    let (state, audit) = common::test_state().await;
    let app = init_app!(state);

    for _ in 0..5 {
        let resp = login_request(USERNAME, PASSWORD, "10.0.0.1:5000")
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = login_request(USERNAME, PASSWORD, "10.0.0.1:5001")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Too Many Requests. Try again later.");

    // Throttled attempts never reach the credential check.
    let successes = audit
        .messages(AuditLevel::Activity)
        .into_iter()
        .filter(|m| m.starts_with("Login successful"))
        .count();
    assert_eq!(successes, 5);
    assert!(audit
        .messages(AuditLevel::Error)
        .iter()
        .any(|m| m.contains("Rate limit exceeded for client 10.0.0.1")));

    // Another client is unaffected.
    let resp = login_request(USERNAME, PASSWORD, "10.0.0.9:5000")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_failed_attempts_count_toward_limit() {
    let (state, _) = common::test_state().await;
    let app = init_app!(state);

    for _ in 0..5 {
        let resp = login_request(USERNAME, "nope", "10.0.0.1:5000")
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = login_request(USERNAME, PASSWORD, "10.0.0.1:5000")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn test_malformed_login_body() {
    let (state, _) = common::test_state().await;
    let app = init_app!(state);

    let resp = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "username": USERNAME }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
