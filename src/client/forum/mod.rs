//! # Forum Controller
//!
//! Owns the loaded post list and one reply forest per post, and applies
//! user actions on top of them.
//!
//! ## Loading
//!
//! [`ForumController::load`] lists the posts, then fetches every post's
//! comments concurrently. Each fetch threads and stores its own result as
//! soon as it completes, so one slow or failing post never holds back the
//! others. Failures end up in the returned [`LoadReport`].
//!
//! ## Optimistic updates
//!
//! Likes raise the local count before the write goes out. When the write
//! fails the count is rolled back (configurable) and a generic message is
//! kept for the UI until [`ForumController::take_error`] collects it.
//! The like write itself is read-modify-write on the client and two clients
//! liking the same post at once can lose one increment.
//!
//! ## Teardown
//!
//! After [`ForumController::close`] fetches that resolve late are dropped
//! instead of being written into state. The flag is read while holding the
//! state lock, so a close that lands while a write waits for the lock still
//! wins.
//!
//! The state lock is never held across an adapter call.

pub mod filter;

pub use filter::{PostFilter, SortOrder};

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::backend::Backend;
use crate::client::thread::{build_threads, ThreadNode};
use crate::shared::error::{ForumError, Result};
use crate::shared::forum::{Comment, CommentId, NewPost, Post, PostId};

pub use crate::shared::forum::KNOWN_SUBTOPICS;

/// Outcome of [`ForumController::load`]
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Posts listed
    pub posts: usize,
    /// Posts whose comment fetch failed
    pub failed: Vec<(PostId, ForumError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct ForumState {
    posts: Vec<Post>,
    threads: HashMap<PostId, Arc<Vec<ThreadNode>>>,
    error: Option<String>,
}

/// Forum view state over one backend
#[derive(Debug)]
pub struct ForumController {
    backend: Arc<Backend>,
    rollback_on_failure: bool,
    state: RwLock<ForumState>,
    closed: AtomicBool,
}

impl ForumController {
    pub fn new(backend: Arc<Backend>, rollback_on_failure: bool) -> Self {
        Self {
            backend,
            rollback_on_failure,
            state: RwLock::new(ForumState::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    /// Load posts and every post's comments
    pub async fn load(&self) -> Result<LoadReport> {
        let posts = match self.backend.list_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                self.record_error(&e).await;
                return Err(e);
            }
        };

        let ids: Vec<PostId> = posts.iter().map(|post| post.id.clone()).collect();
        {
            let mut state = self.state.write().await;
            if self.is_closed() {
                tracing::debug!("Controller closed, discarding post list");
                return Ok(LoadReport::default());
            }
            state.threads.retain(|id, _| ids.contains(id));
            state.posts = posts;
        }
        tracing::info!("Loaded {} posts", ids.len());

        let results = join_all(ids.iter().map(|id| async move { (id, self.fetch_thread(id).await) })).await;

        let mut report = LoadReport {
            posts: ids.len(),
            failed: Vec::new(),
        };
        for (id, result) in results {
            if let Err(e) = result {
                tracing::warn!("Failed to load comments for post {}: {}", id, e);
                report.failed.push((id.clone(), e));
            }
        }
        Ok(report)
    }

    /// Re-fetch one post's comments and replace its forest
    pub async fn refresh_comments(&self, post_id: &PostId) -> Result<()> {
        if let Err(e) = self.fetch_thread(post_id).await {
            self.record_error(&e).await;
            return Err(e);
        }
        Ok(())
    }

    async fn fetch_thread(&self, post_id: &PostId) -> Result<()> {
        let comments = self.backend.list_comments(post_id).await?;
        let forest = build_threads(&comments);

        let mut state = self.state.write().await;
        if self.is_closed() {
            tracing::debug!("Controller closed, discarding comments for post {}", post_id);
            return Ok(());
        }

        tracing::debug!("Threaded {} comments for post {}", comments.len(), post_id);
        state.threads.insert(post_id.clone(), Arc::new(forest));
        Ok(())
    }

    /// Like a post; returns the new count.
    ///
    /// The local count moves first. On failure it is rolled back when
    /// `rollback_on_failure` is set and kept otherwise.
    pub async fn like(&self, post_id: &PostId) -> Result<u64> {
        let new_value = {
            let mut state = self.state.write().await;
            let post = state
                .posts
                .iter_mut()
                .find(|post| &post.id == post_id)
                .ok_or_else(|| ForumError::not_found(format!("Post {} is not loaded", post_id)))?;
            post.likes += 1;
            post.likes
        };

        match self.backend.increment_like(post_id, new_value).await {
            Ok(()) => Ok(new_value),
            Err(e) => {
                tracing::warn!("Like on post {} failed: {}", post_id, e);
                let mut state = self.state.write().await;
                if self.rollback_on_failure {
                    if let Some(post) = state.posts.iter_mut().find(|post| &post.id == post_id) {
                        post.likes = post.likes.saturating_sub(1);
                    }
                }
                state.error = Some(e.user_message().to_string());
                Err(e)
            }
        }
    }

    /// Post a comment or reply, then re-thread the post
    pub async fn submit_comment(
        &self,
        post_id: &PostId,
        parent_id: Option<&CommentId>,
        content: &str,
    ) -> Result<Comment> {
        if content.trim().is_empty() {
            let e = ForumError::validation("content", "Comment cannot be empty");
            self.record_error(&e).await;
            return Err(e);
        }
        if !self.backend.sessions().is_active().await {
            let e = ForumError::validation("author", "You must be logged in to comment");
            self.record_error(&e).await;
            return Err(e);
        }

        let comment = match self.backend.create_comment(post_id, parent_id, content).await {
            Ok(comment) => comment,
            Err(e) => {
                tracing::warn!("Comment on post {} failed: {}", post_id, e);
                self.record_error(&e).await;
                return Err(e);
            }
        };

        // The comment exists server-side even if the re-fetch fails.
        if let Err(e) = self.refresh_comments(post_id).await {
            tracing::warn!("Comment {} saved but post {} could not be refreshed: {}", comment.id, post_id, e);
        }
        Ok(comment)
    }

    /// Create a post and put it at the top of the list
    pub async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut checked = post.validate();
        if checked.is_ok() && !self.backend.sessions().is_active().await {
            checked = Err(ForumError::auth("Sign in required"));
        }
        if let Err(e) = checked {
            self.record_error(&e).await;
            return Err(e);
        }

        let created = match self.backend.create_post(&post).await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!("Creating post failed: {}", e);
                self.record_error(&e).await;
                return Err(e);
            }
        };

        {
            let mut state = self.state.write().await;
            if !self.is_closed() {
                state.posts.insert(0, created.clone());
                state.threads.insert(created.id.clone(), Arc::new(Vec::new()));
            }
        }
        tracing::info!("Created post {}", created.id);
        Ok(created)
    }

    /// Loaded posts projected through `filter`
    pub async fn posts(&self, filter: &PostFilter) -> Vec<Post> {
        filter.apply(&self.state.read().await.posts)
    }

    pub async fn post(&self, post_id: &PostId) -> Option<Post> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .find(|post| &post.id == post_id)
            .cloned()
    }

    /// Reply forest of a post; `None` until its comments have loaded.
    ///
    /// The forest is shared, not copied, and stays valid after a later
    /// refresh replaces it.
    pub async fn threads(&self, post_id: &PostId) -> Option<Arc<Vec<ThreadNode>>> {
        self.state.read().await.threads.get(post_id).cloned()
    }

    /// Take the pending user-facing error, if any
    pub async fn take_error(&self) -> Option<String> {
        self.state.write().await.error.take()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn record_error(&self, error: &ForumError) {
        tracing::debug!("Recording user-facing error for {:?}", error.kind());
        self.state.write().await.error = Some(error.user_message().to_string());
    }
}
