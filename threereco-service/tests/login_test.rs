mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;

use common::{body_json, session_cookie, set_cookie, TestApp};
use service_core::error::UNAUTHORIZED_MESSAGE;
use threereco_service::{
    models::{User, UserType},
    services::Clock,
};

#[tokio::test]
async fn test_login_sets_session_cookie_and_check_returns_principal() {
    let app = TestApp::spawn().await;
    app.seed_user("alice@example.com", "hunter2aa", UserType::Collector)
        .await;

    let response = app
        .request(
            Method::POST,
            "/authentication/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "hunter2aa" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let raw_cookie = set_cookie(&response).expect("session cookie");
    assert!(raw_cookie.contains("Path=/"));
    assert!(raw_cookie.contains("SameSite=Strict"));
    assert!(raw_cookie.contains("Max-Age=3600"));
    let cookie = session_cookie(&response).unwrap();

    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("mfaSecret").is_none());

    let check = app
        .request(Method::GET, "/authentication/check", Some(&cookie), None)
        .await;
    assert_eq!(check.status(), StatusCode::OK);
    assert_eq!(body_json(check).await["email"], "alice@example.com");
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::spawn().await;
    app.seed_user("alice@example.com", "hunter2aa", UserType::Collector)
        .await;

    let response = app
        .request(
            Method::POST,
            "/authentication/login",
            None,
            Some(json!({ "email": "Alice@Example.com", "password": "hunter2aa" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_is_rejected_without_session() {
    let app = TestApp::spawn().await;
    app.seed_user("alice@example.com", "hunter2aa", UserType::Collector)
        .await;

    let response = app
        .request(
            Method::POST,
            "/authentication/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_unknown_email_looks_like_wrong_password() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            Method::POST,
            "/authentication/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "whatever1" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], UNAUTHORIZED_MESSAGE);
}

#[tokio::test]
async fn test_login_clears_previous_mfa_verification() {
    let app = TestApp::spawn().await;
    let mut user = User::new(
        "mfa@example.com".to_string(),
        threereco_service::utils::password::hash_blocking("hunter2aa".to_string())
            .await
            .unwrap(),
        None,
        UserType::Collector,
    );
    user.mfa_secret = Some(threereco_service::services::mfa::generate_secret());
    user.mfa_enabled = true;
    user.mfa_verified = true;
    let user = app.insert(user).await;
    let audit_before = app.audit_logs("users").await.len();

    app.login("mfa@example.com", "hunter2aa").await;

    let stored: User = app.find(user.id).await.unwrap();
    assert!(stored.mfa_enabled);
    assert!(!stored.mfa_verified);
    assert_eq!(app.audit_logs("users").await.len(), audit_before);
}

#[tokio::test]
async fn test_check_without_cookie_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .request(Method::GET, "/authentication/check", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bogus = app
        .request(
            Method::GET,
            "/authentication/check",
            Some("threereco_session=deadbeef"),
            None,
        )
        .await;
    assert_eq!(bogus.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_destroys_session_and_is_idempotent() {
    let app = TestApp::spawn().await;
    app.seed_user("alice@example.com", "hunter2aa", UserType::Collector)
        .await;
    let cookie = app.login("alice@example.com", "hunter2aa").await;

    let response = app
        .request(Method::POST, "/authentication/logout", Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookie(&response).expect("removal cookie");
    assert!(cleared.starts_with("threereco_session=;"));
    assert!(app.sessions.is_empty());

    let again = app
        .request(Method::POST, "/authentication/logout", Some(&cookie), None)
        .await;
    assert_eq!(again.status(), StatusCode::OK);

    let anonymous = app
        .request(Method::POST, "/authentication/logout", None, None)
        .await;
    assert_eq!(anonymous.status(), StatusCode::OK);

    let check = app
        .request(Method::GET, "/authentication/check", Some(&cookie), None)
        .await;
    assert_eq!(check.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_expiry_slides_on_activity() {
    let app = TestApp::spawn().await;
    app.seed_user("alice@example.com", "hunter2aa", UserType::Collector)
        .await;
    let cookie = app.login("alice@example.com", "hunter2aa").await;
    let token = cookie.trim_start_matches("threereco_session=").to_string();

    app.clock.advance(Duration::minutes(30));
    let response = app
        .request(Method::GET, "/authentication/check", Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_some());

    let session = app.state.sessions.load_token(&token).await.unwrap();
    assert!(session.expires_at - app.clock.now() >= Duration::minutes(59));

    // 75 minutes after login, 45 after the last request.
    app.clock.advance(Duration::minutes(45));
    let response = app
        .request(Method::GET, "/authentication/check", Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance(Duration::minutes(61));
    let response = app
        .request(Method::GET, "/authentication/check", Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_invalid_login_payload_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            Method::POST,
            "/authentication/login",
            None,
            Some(json!({ "email": "not-an-email", "password": "x" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Bad Request");
}
