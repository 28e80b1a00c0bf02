//! Comment threading
//!
//! Turns the flat comment rows of one post into a forest of reply trees.
//! Rows are grouped by `parent_id`, the forest is assembled from the group of
//! top-level comments, and siblings are ordered oldest first. Input order
//! breaks timestamp ties.
//!
//! A comment whose parent is not in the same set is an orphan: it is left
//! out together with everything below it. Rows that only reach each other
//! through a parent cycle never connect to a top-level comment and are left
//! out the same way. Nothing is cached between calls.
//!
//! Building, cloning, comparing and dropping all use explicit stacks, so a
//! reply chain of any length never grows the call stack.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::shared::forum::{Comment, CommentId};

/// A comment together with its replies
pub struct ThreadNode {
    pub comment: Comment,
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    pub fn new(comment: Comment) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// Number of comments below this one at any depth
    pub fn reply_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&ThreadNode> = vec![self];
        while let Some(node) = stack.pop() {
            count += node.replies.len();
            stack.extend(node.replies.iter());
        }
        count
    }

    /// Levels in this subtree; a comment without replies has depth 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(usize, &ThreadNode)> = vec![(1, self)];
        while let Some((level, node)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.replies.iter().map(|reply| (level + 1, reply)));
        }
        deepest
    }
}

impl Clone for ThreadNode {
    fn clone(&self) -> Self {
        Self {
            comment: self.comment.clone(),
            replies: clone_forest(&self.replies),
        }
    }
}

/// Copy a forest bottom-up. Walking the pre-order backwards finishes every
/// reply before its parent, and a parent's replies sit on top of `built`
/// in reverse order.
fn clone_forest(forest: &[ThreadNode]) -> Vec<ThreadNode> {
    let order: Vec<&ThreadNode> = preorder(forest).map(|(_, node)| node).collect();
    let mut built: Vec<ThreadNode> = Vec::with_capacity(order.len());
    for node in order.into_iter().rev() {
        let mut replies = built.split_off(built.len() - node.replies.len());
        replies.reverse();
        built.push(ThreadNode {
            comment: node.comment.clone(),
            replies,
        });
    }
    built.reverse();
    built
}

impl PartialEq for ThreadNode {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.comment != b.comment || a.replies.len() != b.replies.len() {
                return false;
            }
            pending.extend(a.replies.iter().zip(b.replies.iter()));
        }
        true
    }
}

impl Eq for ThreadNode {}

impl fmt::Debug for ThreadNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadNode")
            .field("comment", &self.comment)
            .field("replies", &self.replies.len())
            .finish()
    }
}

impl Drop for ThreadNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// Build the reply forest for one post's comments
pub fn build_threads(comments: &[Comment]) -> Vec<ThreadNode> {
    // First row wins when an id repeats.
    let mut seen: HashSet<&CommentId> = HashSet::with_capacity(comments.len());
    let mut children: HashMap<Option<&CommentId>, Vec<usize>> = HashMap::new();
    for (index, comment) in comments.iter().enumerate() {
        if seen.insert(&comment.id) {
            children.entry(comment.parent_id.as_ref()).or_default().push(index);
        }
    }

    // `sort_by` is stable, so equal timestamps keep input order.
    for group in children.values_mut() {
        group.sort_by(|&a, &b| comments[a].created_at.cmp(&comments[b].created_at));
    }

    let roots = children.get(&None).cloned().unwrap_or_default();

    // Pre-order walk from the roots; parents always precede their replies.
    let mut order: Vec<usize> = Vec::with_capacity(comments.len());
    let mut visited = vec![false; comments.len()];
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
        if std::mem::replace(&mut visited[index], true) {
            continue;
        }
        order.push(index);
        if let Some(replies) = children.get(&Some(&comments[index].id)) {
            stack.extend(replies.iter().rev().copied());
        }
    }

    // Assemble bottom-up: walking the pre-order backwards finishes every
    // reply before its parent.
    let mut built: Vec<Option<ThreadNode>> = (0..comments.len()).map(|_| None).collect();
    for &index in order.iter().rev() {
        let mut node = ThreadNode::new(comments[index].clone());
        if let Some(replies) = children.get(&Some(&comments[index].id)) {
            node.replies = replies.iter().filter_map(|&reply| built[reply].take()).collect();
        }
        built[index] = Some(node);
    }

    let forest: Vec<ThreadNode> = roots.iter().filter_map(|&root| built[root].take()).collect();

    let dropped = seen.len() - order.len();
    if dropped > 0 {
        tracing::debug!("Dropped {} orphaned comments", dropped);
    }
    forest
}

/// Pre-order iterator over a forest, yielding `(depth, node)` with top-level
/// comments at depth 0
pub fn preorder(forest: &[ThreadNode]) -> Preorder<'_> {
    Preorder {
        stack: forest.iter().rev().map(|node| (0, node)).collect(),
    }
}

pub struct Preorder<'a> {
    stack: Vec<(usize, &'a ThreadNode)>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (usize, &'a ThreadNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.replies.iter().rev().map(|reply| (depth + 1, reply)));
        Some((depth, node))
    }
}
