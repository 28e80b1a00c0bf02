//! Shared Module
//!
//! Types used by every layer of the client: the normalized forum data model,
//! the error taxonomy and application configuration.
//!
//! # Overview
//!
//! Nothing in here performs I/O apart from reading configuration. Adapters
//! decode provider payloads into their own wire types and convert them into
//! the types below, so the rest of the crate only ever sees one shape.

/// Forum data model (posts, comments, users, sessions)
pub mod forum;

/// Error taxonomy
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use forum::{AuthUser, AuthorRef, Comment, CommentId, NewPost, Post, PostId, ProfileFields, Session, UserId};
pub use error::{ErrorKind, ForumError, Result};
pub use config::{AppConfig, AppConfigBuilder, BackendKind, ConfigError};
