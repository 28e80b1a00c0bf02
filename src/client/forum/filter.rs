//! Post list projection: subtopic filter and sort order.

use std::cmp::Reverse;
use std::str::FromStr;

use crate::shared::error::ForumError;
use crate::shared::forum::Post;

/// How the post list is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first
    #[default]
    Recent,
    /// Most likes first, newest first among equals
    MostLiked,
}

impl FromStr for SortOrder {
    type Err = ForumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recent" | "newest" => Ok(Self::Recent),
            "liked" | "most_liked" | "most-liked" | "likes" => Ok(Self::MostLiked),
            other => Err(ForumError::validation(
                "sort",
                format!("Unknown sort order '{}', expected 'recent' or 'liked'", other),
            )),
        }
    }
}

/// Which posts to show and in what order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Only posts with exactly this subtopic; `None` shows all
    pub subtopic: Option<String>,
    pub sort: SortOrder,
}

impl PostFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subtopic(mut self, subtopic: impl Into<String>) -> Self {
        self.subtopic = Some(subtopic.into());
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Project `posts` through the filter. Never mutates the input.
    pub fn apply(&self, posts: &[Post]) -> Vec<Post> {
        let mut selected: Vec<Post> = posts
            .iter()
            .filter(|post| match &self.subtopic {
                Some(subtopic) => &post.subtopic == subtopic,
                None => true,
            })
            .cloned()
            .collect();

        match self.sort {
            SortOrder::Recent => selected.sort_by_key(|post| Reverse(post.created_at)),
            SortOrder::MostLiked => selected.sort_by_key(|post| (Reverse(post.likes), Reverse(post.created_at))),
        }
        selected
    }
}
