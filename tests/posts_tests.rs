//! Tests for posts, comments, and likes.

mod common;

use axum::http::StatusCode;
use common::{
    PASSWORD, Session, TestApp, create_test_app, json_request, read_json, request, session_from,
};
use serde_json::json;

async fn create_comment(app: &TestApp, session: &Session, post_id: i64) -> i64 {
    let response = app
        .send(json_request(
            "POST",
            &format!("/api/posts/{}/comments", post_id),
            json!({ "contents": "Nice post" }),
            Some(session),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_and_get_post() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;

    let post_id = app.create_post(&carol, "First post").await;

    let response = app
        .send(request("GET", &format!("/api/posts/{}", post_id), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["title"], "First post");
    assert_eq!(body["data"]["userId"], "carol12345");
    assert_eq!(body["data"]["likes"], 0);
}

#[tokio::test]
async fn test_create_post_requires_auth() {
    let app = create_test_app().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/posts",
            json!({ "title": "t", "contents": "c" }),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blank_title_rejected() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/posts",
            json!({ "title": "   ", "contents": "c" }),
            Some(&carol),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["errors"]["title"].is_string());
}

#[tokio::test]
async fn test_only_author_edits_post() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;
    let bob = app.active_user("bob1234567").await;
    let post_id = app.create_post(&carol, "Carol's post").await;
    let uri = format!("/api/posts/{}", post_id);

    let edit = json!({ "title": "Edited", "contents": "Edited" });
    let response = app.send(json_request("PUT", &uri, edit.clone(), Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app.send(request("DELETE", &uri, Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(json_request("PUT", &uri, edit, Some(&carol))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["title"], "Edited");

    let response = app.send(request("DELETE", &uri, Some(&carol))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.send(request("GET", &uri, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_listing() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;

    let response = app.send(request("GET", "/api/posts", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_json(response).await.get("data").is_none());

    for i in 0..12 {
        app.create_post(&carol, &format!("Post {}", i)).await;
    }

    let response = app
        .send(request("GET", "/api/posts?page=2&sortBy=title", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["totalElements"], 12);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["postList"].as_array().unwrap().len(), 2);

    let response = app.send(request("GET", "/api/posts?page=3", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .send(request("GET", "/api/posts?page=9223372036854775807", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["statusCode"], 400);
    let response = app.send(request("GET", "/api/posts?page=0", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app.send(request("GET", "/api/posts?sortBy=views", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .send(request("GET", "/api/posts?from=2024-02-01&to=2024-01-01", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comments() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;
    let bob = app.active_user("bob1234567").await;
    let post_id = app.create_post(&carol, "Carol's post").await;
    let list_uri = format!("/api/posts/{}/comments", post_id);

    let response = app.send(request("GET", &list_uri, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_json(response).await.get("data").is_none());

    let comment_id = create_comment(&app, &bob, post_id).await;

    let response = app.send(request("GET", &list_uri, None)).await;
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let comment_uri = format!("{}/{}", list_uri, comment_id);
    let response = app.send(request("DELETE", &comment_uri, Some(&carol))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "PUT",
            &comment_uri,
            json!({ "contents": "Edited" }),
            Some(&bob),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A comment is only reachable through its own post
    let other_post = app.create_post(&carol, "Another").await;
    let response = app
        .send(request(
            "GET",
            &format!("/api/posts/{}/comments/{}", other_post, comment_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(request("DELETE", &comment_uri, Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_like_toggle_round_trip() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;
    let bob = app.active_user("bob1234567").await;
    let post_id = app.create_post(&carol, "Carol's post").await;
    let like_uri = format!("/api/posts/{}/like", post_id);

    for (is_like, likes) in [(true, 1), (false, 0), (true, 1)] {
        let response = app.send(request("POST", &like_uri, Some(&bob))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["isLike"], is_like);
        assert_eq!(body["data"]["likes"], likes);
        assert_eq!(body["data"]["id"], post_id);
    }

    let response = app
        .send(request("GET", &format!("/api/posts/{}", post_id), None))
        .await;
    assert_eq!(read_json(response).await["data"]["likes"], 1);
}

#[tokio::test]
async fn test_self_like_rejected() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;
    let bob = app.active_user("bob1234567").await;
    let post_id = app.create_post(&carol, "Carol's post").await;
    let comment_id = create_comment(&app, &bob, post_id).await;

    let response = app
        .send(request("POST", &format!("/api/posts/{}/like", post_id), Some(&carol)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(request(
            "POST",
            &format!("/api/posts/{}/comments/{}/like", post_id, comment_id),
            Some(&bob),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Carol can like Bob's comment
    let response = app
        .send(request(
            "POST",
            &format!("/api/posts/{}/comments/{}/like", post_id, comment_id),
            Some(&carol),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["likes"], 1);
}

#[tokio::test]
async fn test_like_missing_post() {
    let app = create_test_app().await;
    let bob = app.active_user("bob1234567").await;

    let response = app
        .send(request("POST", "/api/posts/4242/like", Some(&bob)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_requires_auth() {
    let app = create_test_app().await;

    let response = app.send(request("POST", "/api/posts/1/like", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_withdrawn_author_cannot_change_content() {
    let app = create_test_app().await;
    let carol = app.active_user("carol12345").await;
    let post_id = app.create_post(&carol, "Carol's post").await;
    let comment_id = create_comment(&app, &carol, post_id).await;

    // Withdraw from a second device; the first device's access token stays valid
    let other_device = session_from(&app.login("carol12345", PASSWORD).await).unwrap();
    let response = app
        .send(json_request(
            "PUT",
            "/api/users/withdraw",
            json!({ "password": PASSWORD }),
            Some(&other_device),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let post_uri = format!("/api/posts/{}", post_id);
    let comment_uri = format!("{}/comments/{}", post_uri, comment_id);
    let edit = json!({ "title": "Edited", "contents": "Edited" });

    let response = app
        .send(json_request("PUT", &post_uri, edit.clone(), Some(&carol)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app.send(request("DELETE", &post_uri, Some(&carol))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .send(json_request("PUT", &comment_uri, edit, Some(&carol)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app.send(request("DELETE", &comment_uri, Some(&carol))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(request("GET", &post_uri, None)).await;
    assert_eq!(read_json(response).await["data"]["title"], "Carol's post");
    let response = app.send(request("GET", &comment_uri, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
