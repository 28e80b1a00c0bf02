//! Managed Provider Adapter
//!
//! Hosted auth and table service. Auth goes through the `/auth/v1` routes,
//! table access through `/rest/v1/<table>` with filter query parameters.
//! Every request carries the project `apikey` header and a bearer token:
//! the session token when signed in, the anon key otherwise.
//!
//! Author names come from the `profiles` table through a relational embed on
//! `user_id`, so a single request returns rows with their display name.

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::Operation;
use crate::client::session::SessionStore;
use crate::shared::error::{ForumError, Result};
use crate::shared::forum::{
    AuthUser, AuthorRef, Comment, CommentId, NewPost, Post, PostId, ProfileFields, Session, UserId,
};

/// Table holding comments
pub const COMMENTS_TABLE: &str = "comments";

/// Select clause embedding the author's display name
const AUTHOR_SELECT: &str = "*,profiles:user_id(full_name)";

/// Managed provider client
#[derive(Debug, Clone)]
pub struct ManagedAdapter {
    base_url: String,
    anon_key: String,
    posts_collection: String,
    client: Client,
    sessions: Arc<SessionStore>,
}

/// Error object returned by either the auth or the table service
#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    code: Option<Value>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ProviderError {
    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Number(code)) => Some(code.to_string()),
            _ => None,
        })
    }

    fn message(&self) -> Option<String> {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
    #[serde(default)]
    identities: Option<Vec<Value>>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(value: GoTrueUser) -> Self {
        let metadata = value.user_metadata.unwrap_or_default();
        Self {
            id: value.id,
            email: value.email.unwrap_or_default(),
            first_name: metadata.first_name,
            last_name: metadata.last_name,
            phone: metadata.phone.or(value.phone).filter(|p| !p.is_empty()),
        }
    }
}

/// Sign-up answers with the bare user when confirmation is pending and with
/// `{user, session}` otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Bare(GoTrueUser),
    Wrapped { user: Option<GoTrueUser> },
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct SignUpMetadata<'a> {
    first_name: Option<&'a str>,
    last_name: Option<&'a str>,
    phone: Option<&'a str>,
    full_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: GoTrueUser,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileEmbed {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostRow {
    id: PostId,
    title: String,
    content: String,
    #[serde(default)]
    subtopic: Option<String>,
    #[serde(default)]
    likes: Option<i64>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    profiles: Option<ProfileEmbed>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            subtopic: row.subtopic.unwrap_or_default(),
            likes: row.likes.unwrap_or(0).max(0) as u64,
            created_at: row.created_at,
            author: AuthorRef {
                user_id: row.user_id,
                display_name: row.profiles.and_then(|p| p.full_name),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: CommentId,
    post_id: PostId,
    #[serde(default)]
    parent_id: Option<CommentId>,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    profiles: Option<ProfileEmbed>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            content: row.content,
            created_at: row.created_at,
            author: AuthorRef {
                user_id: row.user_id,
                display_name: row.profiles.and_then(|p| p.full_name),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct PostInsert<'a> {
    title: &'a str,
    content: &'a str,
    subtopic: &'a str,
    user_id: &'a UserId,
    likes: u64,
}

#[derive(Debug, Serialize)]
struct CommentInsert<'a> {
    post_id: &'a PostId,
    parent_id: Option<&'a CommentId>,
    content: &'a str,
    user_id: &'a UserId,
}

#[derive(Debug, Serialize)]
struct LikesUpdate {
    likes: u64,
}

impl ManagedAdapter {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        posts_collection: impl Into<String>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            posts_collection: posts_collection.into(),
            client: Client::new(),
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn posts_collection(&self) -> &str {
        &self.posts_collection
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Start a request with the project key and the best available bearer
    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self
            .sessions
            .token()
            .await
            .unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn signed_in_user(&self) -> Result<UserId> {
        self.sessions
            .get()
            .await
            .map(|session| session.user.id)
            .ok_or_else(|| ForumError::auth("Sign in required"))
    }

    pub async fn sign_up(&self, email: &str, password: &str, profile: &ProfileFields) -> Result<AuthUser> {
        let body = SignUpRequest {
            email,
            password,
            data: SignUpMetadata {
                first_name: profile.first_name.as_deref(),
                last_name: profile.last_name.as_deref(),
                phone: profile.phone.as_deref(),
                full_name: profile.full_name(),
            },
        };

        let request = self.request(Method::POST, self.auth_url("signup")).await.json(&body);
        let response: SignUpResponse = self.fetch_json(request, Operation::SignUp, Some(email)).await?;

        let user = match response {
            SignUpResponse::Bare(user) => user,
            SignUpResponse::Wrapped { user: Some(user) } => user,
            SignUpResponse::Wrapped { user: None } => {
                return Err(ForumError::server(None, "Sign-up response did not include a user"))
            }
        };

        // An existing address comes back as an obfuscated user with no identities.
        if matches!(&user.identities, Some(identities) if identities.is_empty()) {
            tracing::warn!("Sign-up rejected, {} is already registered", email);
            return Err(ForumError::DuplicateUser {
                email: email.to_string(),
            });
        }

        let user = AuthUser::from(user);
        tracing::info!("Registered new user {}", user.email);
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .request(Method::POST, self.auth_url("token"))
            .await
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        let token: TokenResponse = self.fetch_json(request, Operation::SignIn, Some(email)).await?;

        let session = Session {
            token: token.access_token,
            user: token.user.into(),
        };
        self.sessions.set(session.clone()).await?;
        tracing::info!("Signed in as {}", session.user.email);
        Ok(session)
    }

    /// Revoke the token best-effort, then forget the session
    pub async fn sign_out(&self) -> Result<()> {
        if self.sessions.is_active().await {
            let request = self.request(Method::POST, self.auth_url("logout")).await;
            if let Err(e) = self.execute(request, Operation::SignOut, None).await {
                tracing::warn!("Token revocation failed, clearing session anyway: {}", e);
            }
        }
        self.sessions.clear().await
    }

    pub async fn fetch_profile(&self) -> Result<Option<AuthUser>> {
        if !self.sessions.is_active().await {
            return Ok(None);
        }
        let request = self.request(Method::GET, self.auth_url("user")).await;
        let user: GoTrueUser = self.fetch_json(request, Operation::Profile, None).await?;
        let user = AuthUser::from(user);
        self.sessions.update_user(user.clone()).await?;
        Ok(Some(user))
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let request = self
            .request(Method::GET, self.rest_url(&self.posts_collection))
            .await
            .query(&[("select", AUTHOR_SELECT), ("order", "created_at.desc")]);
        let rows: Vec<PostRow> = self.fetch_json(request, Operation::ListPosts, None).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let user_id = self.signed_in_user().await?;
        let request = self
            .request(Method::POST, self.rest_url(&self.posts_collection))
            .await
            .query(&[("select", AUTHOR_SELECT)])
            .header("Prefer", "return=representation")
            .json(&PostInsert {
                title: &post.title,
                content: &post.content,
                subtopic: &post.subtopic,
                user_id: &user_id,
                likes: 0,
            });
        let rows: Vec<PostRow> = self.fetch_json(request, Operation::CreatePost, None).await?;
        rows.into_iter()
            .next()
            .map(Post::from)
            .ok_or_else(|| ForumError::server(None, "Insert returned no post"))
    }

    pub async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let post_filter = format!("eq.{}", post_id);
        let request = self
            .request(Method::GET, self.rest_url(COMMENTS_TABLE))
            .await
            .query(&[
                ("select", AUTHOR_SELECT),
                ("post_id", post_filter.as_str()),
                ("order", "created_at.asc"),
            ]);
        let rows: Vec<CommentRow> = self.fetch_json(request, Operation::ListComments, None).await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    pub async fn create_comment(
        &self,
        post_id: &PostId,
        parent_id: Option<&CommentId>,
        content: &str,
    ) -> Result<Comment> {
        let user_id = self.signed_in_user().await?;
        let request = self
            .request(Method::POST, self.rest_url(COMMENTS_TABLE))
            .await
            .query(&[("select", AUTHOR_SELECT)])
            .header("Prefer", "return=representation")
            .json(&CommentInsert {
                post_id,
                parent_id,
                content,
                user_id: &user_id,
            });
        let rows: Vec<CommentRow> = self.fetch_json(request, Operation::CreateComment, None).await?;
        rows.into_iter()
            .next()
            .map(Comment::from)
            .ok_or_else(|| ForumError::server(None, "Insert returned no comment"))
    }

    pub async fn increment_like(&self, post_id: &PostId, new_value: u64) -> Result<()> {
        let id_filter = format!("eq.{}", post_id);
        let request = self
            .request(Method::PATCH, self.rest_url(&self.posts_collection))
            .await
            .query(&[("id", id_filter.as_str()), ("select", "id")])
            .header("Prefer", "return=representation")
            .json(&LikesUpdate { likes: new_value });
        let rows: Vec<Value> = self.fetch_json(request, Operation::IncrementLike, None).await?;
        if rows.is_empty() {
            return Err(ForumError::not_found(format!("Post {} not found", post_id)));
        }
        Ok(())
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: Operation,
        email: Option<&str>,
    ) -> Result<T> {
        let response = self.execute(request, operation, email).await?;
        Ok(response.json::<T>().await?)
    }

    async fn execute(&self, request: RequestBuilder, operation: Operation, email: Option<&str>) -> Result<Response> {
        tracing::debug!("managed {:?} request", operation);
        let response = request.send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ProviderError>(&text).unwrap_or_default();

        let error = normalize_provider_error(status, &body, operation, email, text);
        tracing::warn!("managed {:?} failed: {}", operation, error);
        Err(error)
    }
}

/// Map a provider error object onto the error taxonomy
fn normalize_provider_error(
    status: u16,
    body: &ProviderError,
    operation: Operation,
    email: Option<&str>,
    raw: String,
) -> ForumError {
    let code = body.code().unwrap_or_default();
    let message = body.message().unwrap_or(raw);
    let lowered = message.to_ascii_lowercase();

    if operation == Operation::SignUp
        && (matches!(code.as_str(), "user_already_exists" | "email_exists" | "23505")
            || lowered.contains("already registered"))
    {
        return ForumError::DuplicateUser {
            email: email.unwrap_or_default().to_string(),
        };
    }

    if operation == Operation::SignIn
        && (code == "invalid_credentials"
            || body.error.as_deref() == Some("invalid_grant")
            || lowered.contains("invalid login credentials"))
    {
        return ForumError::InvalidCredentials;
    }

    match code.as_str() {
        "PGRST301" | "PGRST302" | "42501" | "bad_jwt" | "no_authorization" | "session_not_found" => {
            return ForumError::auth(message)
        }
        "PGRST116" | "user_not_found" => return ForumError::not_found(message),
        "23502" | "23503" | "23505" | "22P02" | "validation_failed" | "weak_password" => {
            return ForumError::validation("request", message)
        }
        _ => {}
    }

    match status {
        401 | 403 => ForumError::auth(message),
        404 => ForumError::not_found(message),
        400 | 409 | 422 => ForumError::validation("request", message),
        _ => ForumError::server(Some(status), message),
    }
}
