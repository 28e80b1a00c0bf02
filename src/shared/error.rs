//! Forum Error Types
//!
//! This module defines the single error taxonomy that every backend adapter
//! normalizes into. Callers never see an HTTP status code or a provider error
//! object directly; they see one of the variants below.
//!
//! # Error Categories
//!
//! - `DuplicateUser` - Sign-up with an email that is already registered
//! - `InvalidCredentials` - Unknown email or wrong password on sign-in
//! - `Auth` - Missing, invalid or expired token
//! - `Validation` - Missing or malformed fields, caught before the network when possible
//! - `NotFound` - The addressed record does not exist
//! - `Server` - Any 5xx or unexpected provider/local failure
//!
//! # Usage
//!
//! ```rust
//! use maternal_forum::shared::error::{ErrorKind, ForumError};
//!
//! let error = ForumError::validation("content", "Comment cannot be empty");
//! assert_eq!(error.kind(), ErrorKind::Validation);
//! ```
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ForumError>;

/// Normalized error for every adapter and controller operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForumError {
    /// The email is already registered
    #[error("a user with email '{email}' already exists")]
    DuplicateUser {
        /// Email that was rejected
        email: String,
    },

    /// The email is unknown or the password check failed
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Missing, invalid or expired token
    #[error("authorization failed: {message}")]
    Auth {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// The addressed record does not exist
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable error message
        message: String,
    },

    /// Server-side or otherwise unexpected failure
    #[error("server error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Server {
        /// HTTP status when the failure came from a response
        status: Option<u16>,
        /// Human-readable error message
        message: String,
    },
}

/// Payload-free mirror of [`ForumError`] for matching and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateUser,
    InvalidCredentials,
    Auth,
    Validation,
    NotFound,
    Server,
}

impl ForumError {
    /// Create a new authorization error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new server error
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// The taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateUser { .. } => ErrorKind::DuplicateUser,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Server { .. } => ErrorKind::Server,
        }
    }

    /// Generic message suitable for showing to an end user.
    ///
    /// Full detail stays in the `Display` output, which goes to the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DuplicateUser { .. } => "An account with this email already exists.",
            Self::InvalidCredentials => "Incorrect email or password.",
            Self::Auth { .. } => "Please log in to continue.",
            Self::Validation { .. } => "Please check the highlighted fields and try again.",
            Self::NotFound { .. } => "That item could not be found.",
            Self::Server { .. } => "Something went wrong. Please try again later.",
        }
    }
}

impl From<serde_json::Error> for ForumError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        Self::server(None, format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for ForumError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        let status = err.status().map(|s| s.as_u16());
        if err.is_decode() {
            return Self::server(status, format!("Failed to parse response: {}", err));
        }
        Self::server(status, format!("Network error: {}", err))
    }
}

impl From<sqlx::Error> for ForumError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Local storage error: {:?}", err);
        Self::server(None, format!("Local storage error: {}", err))
    }
}
