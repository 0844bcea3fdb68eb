//! Tests for account endpoints and email verification.

mod common;

use axum::http::StatusCode;
use common::{
    PASSWORD, TestAppBuilder, create_test_app, json_request, read_json, request, session_from,
};
use serde_json::json;
use studyhall::account::AccountState;

#[tokio::test]
async fn test_signup_creates_unverified_user() {
    let app = create_test_app().await;

    let response = app.signup("alice12345", "alice@example.com").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["data"]["userId"], "alice12345");
    assert_eq!(body["data"]["state"], "UNVERIFIED");
    assert!(body["data"].get("password").is_none());

    let user = app
        .db
        .users()
        .get_by_user_id("alice12345")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password_hash, PASSWORD);
}

#[tokio::test]
async fn test_signup_duplicates_rejected() {
    let app = create_test_app().await;
    app.signup("alice12345", "alice@example.com").await;

    let response = app.signup("alice12345", "other@example.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["message"], "User ID is already taken");

    let response = app.signup("alice67890", "alice@example.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["message"],
        "Email is already registered"
    );
}

#[tokio::test]
async fn test_signup_field_validation() {
    let app = create_test_app().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/users/signup",
            json!({
                "userId": "short",
                "password": "weakpassword",
                "name": "  ",
                "email": "not-an-email",
            }),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    let errors = body["errors"].as_object().unwrap();
    for field in ["userId", "password", "name", "email"] {
        assert!(errors.contains_key(field), "missing error for {}", field);
    }
}

#[tokio::test]
async fn test_login_failures() {
    let app = create_test_app().await;
    app.signup("alice12345", "alice@example.com").await;

    let response = app.login("alice12345", "Wrongpass1!").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("authorization").is_none());

    let response = app.login("nobody1234", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_stores_refresh_token() {
    let app = create_test_app().await;
    app.signup("alice12345", "alice@example.com").await;

    let response = app.login("alice12345", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = session_from(&response).unwrap();

    let user = app
        .db
        .users()
        .get_by_user_id("alice12345")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.refresh_token.as_deref(), Some(session.refresh.as_str()));
    assert!(app.jwt.validate_access_token(&session.access).is_ok());
}

#[tokio::test]
async fn test_email_verification_flow() {
    let app = create_test_app().await;
    let session = app.unverified_user("alice12345").await;

    let response = app
        .send(request("POST", "/api/mails", Some(&session)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let code = app.mailer.last_code("alice12345@example.com").unwrap();

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let response = app
        .send(json_request(
            "POST",
            "/api/mails/verify",
            json!({ "code": wrong }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "POST",
            "/api/mails/verify",
            json!({ "code": code }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = app
        .db
        .users()
        .get_by_user_id("alice12345")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::Active);

    // Already verified
    let response = app
        .send(json_request(
            "POST",
            "/api/mails/verify",
            json!({ "code": code }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_without_code_issued() {
    let app = create_test_app().await;
    let session = app.unverified_user("alice12345").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/mails/verify",
            json!({ "code": "123456" }),
            Some(&session),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mail_failure_is_server_error() {
    let app = TestAppBuilder::new().failing_mailer().build().await;
    let session = app.unverified_user("alice12345").await;

    let response = app
        .send(request("POST", "/api/mails", Some(&session)))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_withdraw() {
    let app = create_test_app().await;
    let session = app.active_user("alice12345").await;

    let response = app
        .send(json_request(
            "PUT",
            "/api/users/withdraw",
            json!({ "password": "Wrongpass1!" }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "PUT",
            "/api/users/withdraw",
            json!({ "password": PASSWORD }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = app
        .db
        .users()
        .get_by_user_id("alice12345")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::Deactivated);

    // Session is gone and the account cannot log back in
    let response = app
        .send(request("GET", "/api/users/mypage", Some(&session)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app.login("alice12345", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_after_withdrawal_on_other_device() {
    let app = create_test_app().await;
    let laptop = app.active_user("alice12345").await;
    let phone = session_from(&app.login("alice12345", PASSWORD).await).unwrap();

    let response = app
        .send(json_request(
            "PUT",
            "/api/users/withdraw",
            json!({ "password": PASSWORD }),
            Some(&phone),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The laptop's tokens were never revoked but the account is gone
    let response = app
        .send(request("POST", "/api/users/logout", Some(&laptop)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["statusCode"], 400);
    assert!(body["message"].is_string());

    let response = app
        .send(json_request(
            "POST",
            "/api/mails/verify",
            json!({ "code": "123456" }),
            Some(&laptop),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let user = app
        .db
        .users()
        .get_by_user_id("alice12345")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::Deactivated);
}

#[tokio::test]
async fn test_update_my_page_keeps_absent_fields() {
    let app = create_test_app().await;
    let session = app.active_user("alice12345").await;

    let response = app
        .send(json_request(
            "PUT",
            "/api/users/mypage",
            json!({ "introduce": "Hello there", "currentPassword": PASSWORD }),
            Some(&session),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["name"], "alice12345");
    assert_eq!(body["data"]["introduce"], "Hello there");
}

#[tokio::test]
async fn test_change_password() {
    let app = create_test_app().await;
    let session = app.active_user("alice12345").await;

    let response = app
        .send(json_request(
            "PUT",
            "/api/users/password",
            json!({ "currentPassword": PASSWORD, "newPassword": PASSWORD }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "PUT",
            "/api/users/password",
            json!({ "currentPassword": PASSWORD, "newPassword": "Newpassword2@" }),
            Some(&session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        app.login("alice12345", PASSWORD).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.login("alice12345", "Newpassword2@").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_public_profile() {
    let app = create_test_app().await;
    app.signup("alice12345", "alice@example.com").await;
    let user = app
        .db
        .users()
        .get_by_user_id("alice12345")
        .await
        .unwrap()
        .unwrap();

    let response = app
        .send(request("GET", &format!("/api/users/{}", user.id), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["userId"], "alice12345");
    assert!(body["data"].get("email").is_none());

    let response = app.send(request("GET", "/api/users/9999", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
