//! Backend and payload fixtures
//!
//! Builds backends pointed at a `wiremock` server and the JSON bodies each
//! provider sends back.

use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

use maternal_forum::client::{Backend, ForumController, SessionStore};
use maternal_forum::shared::{AppConfig, AuthUser, BackendKind, Session, UserId};

/// Anon key configured for the managed provider in tests
pub const ANON_KEY: &str = "anon-test-key";

/// Test user credentials
pub struct TestUser {
    pub id: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub token: &'static str,
}

pub const ADA: TestUser = TestUser {
    id: "7",
    email: "ada@example.com",
    password: "correct horse",
    token: "tok-ada",
};

/// Create authorization header value
pub fn auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn test_session(user: &TestUser) -> Session {
    Session {
        token: user.token.to_string(),
        user: AuthUser {
            id: UserId::new(user.id),
            email: user.email.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Obi".to_string()),
            phone: None,
        },
    }
}

pub fn relational_backend(server: &MockServer) -> (Arc<Backend>, Arc<SessionStore>) {
    let config = AppConfig::builder()
        .backend(BackendKind::Relational)
        .relational_url(server.uri())
        .build()
        .expect("valid relational config");
    let sessions = Arc::new(SessionStore::in_memory());
    let backend = Backend::from_config(&config, sessions.clone()).expect("backend");
    (Arc::new(backend), sessions)
}

pub fn managed_backend(server: &MockServer) -> (Arc<Backend>, Arc<SessionStore>) {
    let config = AppConfig::builder()
        .backend(BackendKind::Managed)
        .managed_url(server.uri())
        .managed_anon_key(ANON_KEY)
        .build()
        .expect("valid managed config");
    let sessions = Arc::new(SessionStore::in_memory());
    let backend = Backend::from_config(&config, sessions.clone()).expect("backend");
    (Arc::new(backend), sessions)
}

pub fn relational_controller(server: &MockServer, rollback_on_failure: bool) -> (ForumController, Arc<SessionStore>) {
    let (backend, sessions) = relational_backend(server);
    (ForumController::new(backend, rollback_on_failure), sessions)
}

/// Post as the relational API returns it
pub fn api_post(id: i64, title: &str, subtopic: &str, likes: i64, created_at: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": format!("{} body", title),
        "subtopic": subtopic,
        "likes": likes,
        "created_at": created_at,
        "user_id": 7,
        "author": "Ada Obi"
    })
}

/// Comment as the relational API returns it
pub fn api_comment(id: i64, post_id: i64, parent_id: Option<i64>, created_at: &str) -> Value {
    json!({
        "id": id,
        "post_id": post_id,
        "parent_id": parent_id,
        "content": format!("comment {}", id),
        "created_at": created_at,
        "user_id": 7,
        "author": "Ada Obi"
    })
}

/// User object as the managed auth service returns it
pub fn gotrue_user(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "aud": "authenticated",
        "email": email,
        "phone": "",
        "user_metadata": {
            "first_name": "Ada",
            "last_name": "Obi",
            "full_name": "Ada Obi"
        },
        "identities": [{"provider": "email", "identity_id": "i-1"}]
    })
}

/// Post row with the embedded author profile
pub fn managed_post(id: &str, likes: i64, created_at: &str) -> Value {
    json!({
        "id": id,
        "title": format!("post {}", id),
        "content": "body",
        "subtopic": "Postpartum",
        "likes": likes,
        "created_at": created_at,
        "user_id": "u-1",
        "profiles": {"full_name": "Ada Obi"}
    })
}

/// Comment row with the embedded author profile
pub fn managed_comment(id: &str, post_id: &str, parent_id: Option<&str>, created_at: &str) -> Value {
    json!({
        "id": id,
        "post_id": post_id,
        "parent_id": parent_id,
        "content": format!("comment {}", id),
        "created_at": created_at,
        "user_id": "u-1",
        "profiles": {"full_name": "Ada Obi"}
    })
}
