//! Maternal Forum - Community Core Library
//!
//! The discussion core of a maternal-health portal: members read and write
//! posts, discuss them in threaded comments and like them. Data lives behind
//! one of two providers, a managed auth + table service or the portal's own
//! relational HTTP API, and the library hides which one is in use.
//!
//! # Module Structure
//!
//! - **`shared`** - Types every layer uses
//!   - Forum data model (posts, comments, users, sessions)
//!   - Error taxonomy
//!   - Configuration
//!
//! - **`client`** - Everything that runs on the member's side
//!   - Local SQLite store and the session store on top of it
//!   - Backend adapters for both providers
//!   - Comment threading
//!   - Forum controller with optimistic likes and comment submission
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maternal_forum::client::{Backend, ForumController, PostFilter, SessionStore};
//! use maternal_forum::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let sessions = Arc::new(SessionStore::in_memory());
//! let backend = Arc::new(Backend::from_config(&config, sessions)?);
//!
//! let forum = ForumController::new(backend, config.rollback_on_failure);
//! forum.load().await?;
//! for post in forum.posts(&PostFilter::new()).await {
//!     println!("{} ({} likes)", post.title, post.likes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`shared::Result`]; provider failures are
//! normalized into [`shared::ForumError`] before they leave an adapter.

/// Shared types and data structures
pub mod shared;

/// Client-side storage, adapters and forum state
pub mod client;
