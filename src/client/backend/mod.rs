//! Backend Adapters
//!
//! The forum talks to exactly one data provider per process, chosen once at
//! startup from [`AppConfig::backend`]:
//!
//! - [`ManagedAdapter`] - hosted auth + tables (GoTrue/PostgREST style)
//! - [`RelationalApiAdapter`] - the portal's own HTTP API with bearer tokens
//!
//! [`Backend`] wraps both and exposes the one contract the rest of the
//! client programs against. Checks that do not depend on the provider (local
//! credential validation, result ordering, answering `current_user` from the
//! cached session) live here so both adapters behave identically.

pub mod managed;
pub mod relational;

pub use managed::ManagedAdapter;
pub use relational::RelationalApiAdapter;

use std::sync::Arc;

use crate::client::session::SessionStore;
use crate::shared::config::{AppConfig, BackendKind};
use crate::shared::error::{ForumError, Result};
use crate::shared::forum::{
    validate_credentials, AuthUser, Comment, CommentId, NewPost, Post, PostId, ProfileFields, Session,
};

/// Adapter operation, used for error normalization and log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    SignUp,
    SignIn,
    SignOut,
    Profile,
    ListPosts,
    CreatePost,
    ListComments,
    CreateComment,
    IncrementLike,
}

/// The active data provider
#[derive(Debug, Clone)]
pub enum Backend {
    Managed(ManagedAdapter),
    Relational(RelationalApiAdapter),
}

impl Backend {
    /// Build the adapter named by the configuration
    pub fn from_config(config: &AppConfig, sessions: Arc<SessionStore>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ForumError::validation("config", e.to_string()))?;

        let backend = match config.backend {
            BackendKind::Managed => Self::Managed(ManagedAdapter::new(
                config.managed_url.clone().unwrap_or_default(),
                config.managed_anon_key.clone().unwrap_or_default(),
                config.posts_collection.clone(),
                sessions,
            )),
            BackendKind::Relational => {
                Self::Relational(RelationalApiAdapter::new(config.relational_url.clone(), sessions))
            }
        };

        tracing::info!("Using {:?} backend", backend.kind());
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Managed(_) => BackendKind::Managed,
            Self::Relational(_) => BackendKind::Relational,
        }
    }

    /// Session store shared with the adapter
    pub fn sessions(&self) -> &Arc<SessionStore> {
        match self {
            Self::Managed(adapter) => adapter.sessions(),
            Self::Relational(adapter) => adapter.sessions(),
        }
    }

    /// Register a new account. Does not sign in.
    pub async fn sign_up(&self, email: &str, password: &str, profile: &ProfileFields) -> Result<AuthUser> {
        validate_credentials(email, password)?;
        let email = email.trim();
        match self {
            Self::Managed(adapter) => adapter.sign_up(email, password, profile).await,
            Self::Relational(adapter) => adapter.sign_up(email, password, profile).await,
        }
    }

    /// Exchange credentials for a session and store it
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_credentials(email, password)?;
        let email = email.trim();
        match self {
            Self::Managed(adapter) => adapter.sign_in(email, password).await,
            Self::Relational(adapter) => adapter.sign_in(email, password).await,
        }
    }

    /// Drop the session; succeeds when already signed out
    pub async fn sign_out(&self) -> Result<()> {
        match self {
            Self::Managed(adapter) => adapter.sign_out().await,
            Self::Relational(adapter) => adapter.sign_out().await,
        }
    }

    /// The signed-in user, straight from the session cache
    pub async fn current_user(&self) -> Option<AuthUser> {
        self.sessions().get().await.map(|session| session.user)
    }

    /// Re-read the signed-in user from the provider
    pub async fn fetch_profile(&self) -> Result<Option<AuthUser>> {
        match self {
            Self::Managed(adapter) => adapter.fetch_profile().await,
            Self::Relational(adapter) => adapter.fetch_profile().await,
        }
    }

    /// All posts, newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let mut posts = match self {
            Self::Managed(adapter) => adapter.list_posts().await?,
            Self::Relational(adapter) => adapter.list_posts().await?,
        };
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!("Listed {} posts", posts.len());
        Ok(posts)
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        post.validate()?;
        match self {
            Self::Managed(adapter) => adapter.create_post(post).await,
            Self::Relational(adapter) => adapter.create_post(post).await,
        }
    }

    /// Comments of one post, oldest first
    pub async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let mut comments = match self {
            Self::Managed(adapter) => adapter.list_comments(post_id).await?,
            Self::Relational(adapter) => adapter.list_comments(post_id).await?,
        };
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    pub async fn create_comment(
        &self,
        post_id: &PostId,
        parent_id: Option<&CommentId>,
        content: &str,
    ) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(ForumError::validation("content", "Comment cannot be empty"));
        }
        match self {
            Self::Managed(adapter) => adapter.create_comment(post_id, parent_id, content).await,
            Self::Relational(adapter) => adapter.create_comment(post_id, parent_id, content).await,
        }
    }

    /// Write `new_value` as the post's like count.
    ///
    /// Read-modify-write on the caller's side: two clients liking at once can
    /// lose an increment.
    pub async fn increment_like(&self, post_id: &PostId, new_value: u64) -> Result<()> {
        match self {
            Self::Managed(adapter) => adapter.increment_like(post_id, new_value).await,
            Self::Relational(adapter) => adapter.increment_like(post_id, new_value).await,
        }
    }
}
