//! Forum Data Model
//!
//! The normalized shapes every adapter produces. Provider-specific payloads
//! are decoded into their own wire types inside each adapter and converted
//! into these before they leave the adapter.
//!
//! Identifiers are strings: the managed provider hands out UUIDs while the
//! relational API uses integer keys, and both arrive here as [`PostId`],
//! [`CommentId`] or [`UserId`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::shared::error::{ForumError, Result};

/// Display name used when an author has no resolvable name
pub const ANONYMOUS: &str = "Anonymous";

/// Subtopics offered by the forum
pub const KNOWN_SUBTOPICS: &[&str] = &["Pregnancy", "Postpartum", "Nutrition", "Mental Health"];

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }
    };
}

string_id!(
    /// Identifier of a forum post
    PostId
);
string_id!(
    /// Identifier of a comment
    CommentId
);
string_id!(
    /// Identifier of a user account
    UserId
);

/// Who wrote a post or comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub user_id: Option<UserId>,
    pub display_name: Option<String>,
}

impl AuthorRef {
    /// Name to show, falling back to [`ANONYMOUS`]
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS)
    }
}

/// A forum post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub subtopic: String,
    /// Only ever raised through like operations
    pub likes: u64,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
}

/// A comment row; `parent_id == None` marks a top-level comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub author: AuthorRef,
    pub created_at: DateTime<Utc>,
}

/// Identity returned by whichever adapter is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl AuthUser {
    /// First and last name joined, if either is present
    pub fn full_name(&self) -> Option<String> {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// The signed-in credential and the user it belongs to
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: AuthUser,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Optional profile data collected at sign-up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl ProfileFields {
    pub fn full_name(&self) -> Option<String> {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// Fields for a new post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub subtopic: String,
}

impl NewPost {
    pub fn new(title: impl Into<String>, content: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            subtopic: subtopic.into(),
        }
    }

    /// Reject blank titles or bodies before anything goes over the wire
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ForumError::validation("title", "Post title cannot be empty"));
        }
        if self.content.trim().is_empty() {
            return Err(ForumError::validation("content", "Post content cannot be empty"));
        }
        Ok(())
    }
}

/// Check an email/password pair locally before calling a provider
pub(crate) fn validate_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ForumError::validation("email", "A valid email address is required"));
    }
    if password.is_empty() {
        return Err(ForumError::validation("password", "Password cannot be empty"));
    }
    Ok(())
}
