//! Property tests for comment threading

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use maternal_forum::client::{build_threads, preorder, ThreadNode};
use maternal_forum::shared::{AuthorRef, Comment, CommentId, PostId};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

#[derive(Debug, Clone)]
enum ParentChoice {
    Root,
    Earlier(usize),
    Missing(u8),
}

fn parent_choice() -> impl Strategy<Value = ParentChoice> {
    prop_oneof![
        2 => Just(ParentChoice::Root),
        5 => any::<usize>().prop_map(ParentChoice::Earlier),
        1 => any::<u8>().prop_map(ParentChoice::Missing),
    ]
}

/// Comment sets whose parents point at earlier rows, the top level, or a
/// row that does not exist. Minutes are drawn from a small range so ties
/// are common.
fn comment_set() -> impl Strategy<Value = Vec<Comment>> {
    prop::collection::vec((parent_choice(), 0i64..6), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (choice, minutes))| {
                let parent_id = match choice {
                    ParentChoice::Root => None,
                    ParentChoice::Earlier(_) if index == 0 => None,
                    ParentChoice::Earlier(pick) => Some(CommentId::new(format!("c{}", pick % index))),
                    ParentChoice::Missing(n) => Some(CommentId::new(format!("missing{}", n))),
                };
                Comment {
                    id: CommentId::new(format!("c{}", index)),
                    post_id: PostId::new("p"),
                    parent_id,
                    content: String::new(),
                    author: AuthorRef::default(),
                    created_at: base() + Duration::minutes(minutes),
                }
            })
            .collect()
    })
}

/// Rows connected to the top level through existing parents
fn reachable(comments: &[Comment]) -> HashSet<CommentId> {
    let mut connected = HashSet::new();
    for comment in comments {
        let keep = match &comment.parent_id {
            None => true,
            Some(parent) => connected.contains(parent),
        };
        if keep {
            connected.insert(comment.id.clone());
        }
    }
    connected
}

fn assert_siblings_sorted(forest: &[ThreadNode], position: &HashMap<CommentId, usize>) {
    for pair in forest.windows(2) {
        let (a, b) = (&pair[0].comment, &pair[1].comment);
        assert!(a.created_at <= b.created_at, "siblings out of order");
        if a.created_at == b.created_at {
            assert!(position[&a.id] < position[&b.id], "tie not broken by input order");
        }
    }
    for node in forest {
        assert_siblings_sorted(&node.replies, position);
    }
}

proptest! {
    #[test]
    fn every_connected_comment_appears_exactly_once(comments in comment_set()) {
        let forest = build_threads(&comments);
        let visited: Vec<CommentId> = preorder(&forest).map(|(_, node)| node.comment.id.clone()).collect();
        let unique: HashSet<CommentId> = visited.iter().cloned().collect();

        prop_assert_eq!(visited.len(), unique.len());
        prop_assert_eq!(unique, reachable(&comments));
    }

    #[test]
    fn orphans_never_appear(comments in comment_set()) {
        let forest = build_threads(&comments);
        let known: HashSet<&CommentId> = comments.iter().map(|c| &c.id).collect();
        for (depth, node) in preorder(&forest) {
            match &node.comment.parent_id {
                None => {
                    prop_assert_eq!(depth, 0);
                }
                Some(parent) => {
                    prop_assert!(known.contains(parent));
                    prop_assert!(depth > 0);
                }
            }
        }
    }

    #[test]
    fn replies_sit_under_their_parent(comments in comment_set()) {
        let forest = build_threads(&comments);
        let mut stack: Vec<&ThreadNode> = forest.iter().collect();
        while let Some(node) = stack.pop() {
            for reply in &node.replies {
                prop_assert_eq!(reply.comment.parent_id.as_ref(), Some(&node.comment.id));
                stack.push(reply);
            }
        }
    }

    #[test]
    fn siblings_ascending_by_creation(comments in comment_set()) {
        let position: HashMap<CommentId, usize> = comments
            .iter()
            .enumerate()
            .map(|(index, c)| (c.id.clone(), index))
            .collect();
        assert_siblings_sorted(&build_threads(&comments), &position);
    }

    #[test]
    fn rebuilding_is_idempotent(comments in comment_set()) {
        prop_assert_eq!(build_threads(&comments), build_threads(&comments));
    }

    #[test]
    fn arbitrary_parent_links_never_duplicate(
        links in prop::collection::vec(0usize..21, 0..20)
    ) {
        // Parents may point forward, at themselves or at nothing (index 20).
        let comments: Vec<Comment> = links
            .iter()
            .enumerate()
            .map(|(index, &parent)| Comment {
                id: CommentId::new(format!("c{}", index)),
                post_id: PostId::new("p"),
                parent_id: if parent == 20 { None } else { Some(CommentId::new(format!("c{}", parent))) },
                content: String::new(),
                author: AuthorRef::default(),
                created_at: base(),
            })
            .collect();

        let forest = build_threads(&comments);
        let visited: Vec<&CommentId> = preorder(&forest).map(|(_, node)| &node.comment.id).collect();
        let unique: HashSet<&CommentId> = visited.iter().copied().collect();
        prop_assert_eq!(visited.len(), unique.len());
        prop_assert!(visited.len() <= comments.len());
    }
}
