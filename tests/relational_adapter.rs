//! Relational API adapter against a mock server

#[macro_use]
mod common;

use common::*;
use maternal_forum::shared::{ForumError, NewPost, PostId, ProfileFields, UserId};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_sign_in_stores_session_and_current_user_is_local() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": ADA.email, "password": ADA.password})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": ADA.token,
            "user": {"id": 7, "email": ADA.email, "first_name": "Ada", "last_name": "Obi", "phone": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    let session = assert_ok!(backend.sign_in(ADA.email, ADA.password).await);
    assert_eq!(session.token, ADA.token);
    assert_eq!(session.user.id, UserId::new("7"));
    assert_eq!(sessions.token().await.as_deref(), Some(ADA.token));

    let user = backend.current_user().await.expect("signed in");
    assert_eq!(user, session.user);
    assert_request_count!(server, 1);
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})))
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    assert_err!(backend.sign_in(ADA.email, "wrong").await, ForumError::InvalidCredentials);
    assert!(sessions.get().await.is_none());
    assert!(backend.current_user().await.is_none());
}

#[tokio::test]
async fn test_duplicate_registration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "User already exists"})))
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    let err = backend
        .sign_up(ADA.email, ADA.password, &ProfileFields::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ForumError::DuplicateUser {
            email: ADA.email.to_string()
        }
    );
    assert!(!sessions.is_active().await);
}

#[tokio::test]
async fn test_registration_does_not_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "email": ADA.email,
            "password": ADA.password,
            "first_name": "Ada",
            "last_name": null,
            "phone": null
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "User registered successfully"})))
        .expect(1)
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    let profile = ProfileFields {
        first_name: Some("Ada".to_string()),
        ..ProfileFields::default()
    };
    let user = assert_ok!(backend.sign_up(ADA.email, ADA.password, &profile).await);
    assert_eq!(user.email, ADA.email);
    assert_eq!(user.first_name.as_deref(), Some("Ada"));
    assert!(!sessions.is_active().await);
}

#[tokio::test]
async fn test_profile_refresh_sends_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .and(header("Authorization", auth_header(ADA.token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "email": ADA.email,
            "first_name": "Adaeze",
            "last_name": "Obi",
            "phone": "555-0100"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    sessions.set(test_session(&ADA)).await.unwrap();

    let user = assert_ok!(backend.fetch_profile().await).expect("profile");
    assert_eq!(user.first_name.as_deref(), Some("Adaeze"));
    assert_eq!(
        backend.current_user().await.and_then(|u| u.phone),
        Some("555-0100".to_string())
    );
    assert_eq!(sessions.token().await.as_deref(), Some(ADA.token));
}

#[tokio::test]
async fn test_expired_token_is_auth_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/forum/posts/3/comments"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Invalid token"})))
        .expect(1)
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    sessions.set(test_session(&ADA)).await.unwrap();

    assert_err!(
        backend.create_comment(&PostId::new("3"), None, "Hello").await,
        ForumError::Auth { .. }
    );
    // The session is left for the caller to deal with.
    assert!(sessions.is_active().await);
}

#[tokio::test]
async fn test_list_posts_normalized_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/forum/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            api_post(1, "Older", "Nutrition", 2, "2024-03-01T10:00:00.000Z"),
            api_post(2, "Newer", "Pregnancy", 0, "2024-03-02T10:00:00.000Z"),
            {"id": 3, "title": "Bare", "content": "x", "created_at": "2024-02-01T10:00:00Z", "likes": null, "author": null}
        ])))
        .mount(&server)
        .await;

    let (backend, _) = relational_backend(&server);
    let posts = assert_ok!(backend.list_posts().await);
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1", "3"]);
    assert_eq!(posts[1].likes, 2);
    assert_eq!(posts[1].author.display_name(), "Ada Obi");
    assert_eq!(posts[2].likes, 0);
    assert_eq!(posts[2].author.display_name(), "Anonymous");
}

#[tokio::test]
async fn test_server_failure_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/forum/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Failed to fetch posts"})))
        .mount(&server)
        .await;

    let (backend, _) = relational_backend(&server);
    assert_err!(
        backend.list_posts().await,
        ForumError::Server { status: Some(500), .. }
    );
}

#[tokio::test]
async fn test_create_post_reads_back_acknowledged_insert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/forum/posts"))
        .and(header("Authorization", auth_header(ADA.token).as_str()))
        .and(body_json(json!({"title": "Iron", "content": "Iron body", "subtopic": "Nutrition"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Post created successfully"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/forum/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            api_post(9, "Iron", "Nutrition", 0, "2024-03-05T10:00:00Z"),
            api_post(8, "Sleep", "Postpartum", 1, "2024-03-04T10:00:00Z")
        ])))
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    sessions.set(test_session(&ADA)).await.unwrap();

    let post = assert_ok!(backend.create_post(&NewPost::new("Iron", "Iron body", "Nutrition")).await);
    assert_eq!(post.id, PostId::new("9"));
}

#[tokio::test]
async fn test_like_writes_caller_value() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/forum/posts/4"))
        .and(header("Authorization", auth_header(ADA.token).as_str()))
        .and(body_json(json!({"likes": 6})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (backend, sessions) = relational_backend(&server);
    sessions.set(test_session(&ADA)).await.unwrap();
    assert_ok!(backend.increment_like(&PostId::new("4"), 6).await);
}

#[tokio::test]
async fn test_sign_out_is_idempotent_and_local() {
    let server = MockServer::start().await;
    Mock::given(any()).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let (backend, sessions) = relational_backend(&server);
    sessions.set(test_session(&ADA)).await.unwrap();

    assert_ok!(backend.sign_out().await);
    assert_ok!(backend.sign_out().await);
    assert!(backend.current_user().await.is_none());
}
