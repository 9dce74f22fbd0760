use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{char_len, lenient_string, parse_uuid, resolve_author_name, trimmed, ANONYMOUS_AUTHOR};

pub const MAX_COMMENT_CHARS: usize = 5000;
pub const ADOPTION_BASE_POINTS: i32 = 80;
pub const ADOPTION_VERIFIED_BONUS: i32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment with its replies nested underneath.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Deepest nesting level of a reply; roots are level 0.
pub const MAX_REPLY_DEPTH: usize = 4;

/// Nests flat comments under their parents.
///
/// Roots and every reply list keep creation order. A comment whose parent is
/// not in the set is promoted to a root, so nothing is dropped. Replies to a
/// comment at `MAX_REPLY_DEPTH` are attached to that comment's own parent, so
/// the tree never gets deeper than that however long a reply chain is.
pub fn build_comment_tree(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    comments.sort_by_key(|comment| comment.created_at);
    let count = comments.len();

    let index_of: HashMap<Uuid, usize> = comments
        .iter()
        .enumerate()
        .map(|(index, comment)| (comment.id, index))
        .collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();

    for (index, comment) in comments.iter().enumerate() {
        match comment.parent_id.and_then(|parent| index_of.get(&parent).copied()) {
            Some(parent) if parent != index => children[parent].push(index),
            _ => roots.push(index),
        }
    }

    // Parent chains that loop back on themselves never reach a root; their
    // earliest unvisited member starts a tree of its own.
    let mut visited = vec![false; count];
    let mut depth = vec![0usize; count];
    let mut attached_to: Vec<Option<usize>> = vec![None; count];
    let mut replies: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut tops = Vec::new();

    for start in roots.into_iter().chain(0..count) {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        tops.push(start);

        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            let (anchor, level) = match attached_to[index] {
                Some(parent) if depth[index] >= MAX_REPLY_DEPTH => (parent, depth[index]),
                _ => (index, depth[index] + 1),
            };
            for &child in &children[index] {
                if visited[child] {
                    continue;
                }
                visited[child] = true;
                depth[child] = level;
                attached_to[child] = Some(anchor);
                replies[anchor].push(child);
                stack.push(child);
            }
        }
    }

    // Deepest first, so every reply node exists before its parent is built.
    let mut by_depth: Vec<usize> = (0..count).collect();
    by_depth.sort_by(|a, b| depth[*b].cmp(&depth[*a]));

    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut nodes: Vec<Option<CommentNode>> = vec![None; count];

    for index in by_depth {
        let mut reply_indexes = std::mem::take(&mut replies[index]);
        reply_indexes.sort_unstable();
        let reply_nodes = reply_indexes.into_iter().filter_map(|reply| nodes[reply].take()).collect();

        if let Some(comment) = slots[index].take() {
            nodes[index] = Some(CommentNode { comment, replies: reply_nodes });
        }
    }

    tops.into_iter().filter_map(|index| nodes[index].take()).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub post_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
}

/// A comment ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_name: String,
    pub content: String,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<NewComment, String> {
        let post_id = trimmed(&self.post_id);
        if post_id.is_empty() {
            return Err("게시글 정보가 없습니다.".to_string());
        }
        let post_id = parse_uuid(&post_id).ok_or_else(|| "댓글을 작성할 수 없는 게시글입니다.".to_string())?;

        let parent = trimmed(&self.parent_id);
        let parent_id = if parent.is_empty() {
            None
        } else {
            Some(parse_uuid(&parent).ok_or_else(|| "유효하지 않은 답글 대상입니다.".to_string())?)
        };

        let content = trimmed(&self.content);
        if content.is_empty() {
            return Err("댓글 내용을 입력해 주세요.".to_string());
        }
        if char_len(&content) > MAX_COMMENT_CHARS {
            return Err(format!("댓글은 {}자 이하로 입력해 주세요.", MAX_COMMENT_CHARS));
        }

        Ok(NewComment {
            post_id,
            parent_id,
            author_name: resolve_author_name(&self.author_name),
            content,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub post_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub comment_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub adopter_name: Option<String>,
}

impl AdoptRequest {
    /// Post and comment ids; malformed ids are a validation error.
    pub fn ids(&self) -> Result<(Uuid, Uuid), String> {
        match (parse_uuid(&trimmed(&self.post_id)), parse_uuid(&trimmed(&self.comment_id))) {
            (Some(post_id), Some(comment_id)) => Ok((post_id, comment_id)),
            _ => Err("유효하지 않은 요청입니다.".to_string()),
        }
    }

    pub fn adopter(&self) -> Option<String> {
        Some(trimmed(&self.adopter_name)).filter(|name| !name.is_empty())
    }
}

/// Points awarded for an adopted answer and the ledger source label.
pub fn adoption_award(author_verified: bool) -> (i32, &'static str) {
    if author_verified {
        (ADOPTION_BASE_POINTS + ADOPTION_VERIFIED_BONUS, "채택 답변(인증 가산 포함)")
    } else {
        (ADOPTION_BASE_POINTS, "채택 답변")
    }
}

/// Name credited for an adopted comment.
pub fn selected_author_name(stored: Option<&str>) -> String {
    match stored.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS_AUTHOR.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionResult {
    pub awarded: i32,
    pub selected_author_name: String,
    pub adopted_comment_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn comment(id: u128, parent: Option<u128>, minute: i64) -> Comment {
        let base = DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z").unwrap().with_timezone(&Utc);
        Comment {
            id: Uuid::from_u128(id),
            post_id: Uuid::from_u128(999),
            parent_id: parent.map(Uuid::from_u128),
            author_name: format!("작성자{}", id),
            content: format!("내용 {}", id),
            created_at: base + Duration::minutes(minute),
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<u128> {
        nodes.iter().map(|node| node.comment.id.as_u128()).collect()
    }

    #[test]
    fn test_tree_nests_replies_in_order() {
        let comments = vec![
            comment(3, Some(1), 5),
            comment(1, None, 0),
            comment(2, None, 1),
            comment(4, Some(1), 3),
            comment(5, Some(4), 6),
        ];
        let tree = build_comment_tree(comments);

        assert_eq!(ids(&tree), vec![1, 2]);
        assert_eq!(ids(&tree[0].replies), vec![4, 3]);
        assert_eq!(ids(&tree[0].replies[0].replies), vec![5]);
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn test_orphans_become_roots() {
        let comments = vec![comment(1, None, 0), comment(2, Some(42), 1), comment(3, Some(2), 2)];
        let tree = build_comment_tree(comments);

        assert_eq!(ids(&tree), vec![1, 2]);
        assert_eq!(ids(&tree[1].replies), vec![3]);
    }

    #[test]
    fn test_cycles_are_not_dropped() {
        let comments = vec![comment(1, Some(2), 0), comment(2, Some(1), 1), comment(3, None, 2)];
        let tree = build_comment_tree(comments);

        let mut count = 0;
        fn walk(nodes: &[CommentNode], count: &mut usize) {
            for node in nodes {
                *count += 1;
                walk(&node.replies, count);
            }
        }
        walk(&tree, &mut count);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_long_reply_chain_is_capped() {
        let chain: Vec<Comment> = (1..=10_000u128)
            .map(|id| comment(id, (id > 1).then(|| id - 1), id as i64))
            .collect();
        let tree = build_comment_tree(chain);

        assert_eq!(ids(&tree), vec![1]);
        let anchor = &tree[0].replies[0].replies[0].replies[0];
        assert_eq!(anchor.comment.id.as_u128(), 4);

        let flattened = ids(&anchor.replies);
        assert_eq!(flattened.len(), 9_997);
        assert_eq!(flattened.first(), Some(&5));
        assert_eq!(flattened.last(), Some(&10_000));
        assert!(flattened.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(anchor.replies.iter().all(|node| node.replies.is_empty()));

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains(&Uuid::from_u128(10_000).to_string()));
    }

    #[test]
    fn test_depth_cap_keeps_shallow_branches() {
        let comments = vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, Some(2), 2),
            comment(4, Some(3), 3),
            comment(5, Some(4), 4),
            comment(6, Some(5), 5),
            comment(7, Some(2), 6),
        ];
        let tree = build_comment_tree(comments);

        let level1 = &tree[0].replies[0];
        assert_eq!(ids(&level1.replies), vec![3, 7]);
        let level3 = &level1.replies[0].replies[0];
        assert_eq!(level3.comment.id.as_u128(), 4);
        assert_eq!(ids(&level3.replies), vec![5, 6]);
    }

    #[test]
    fn test_node_serializes_flat() {
        let tree = build_comment_tree(vec![comment(1, None, 0)]);
        let value = serde_json::to_value(&tree[0]).unwrap();

        assert_eq!(value["authorName"], json!("작성자1"));
        assert_eq!(value["replies"], json!([]));
        assert!(value.get("comment").is_none());
    }

    #[test]
    fn test_create_comment_validation() {
        let request: CreateCommentRequest = serde_json::from_value(json!({
            "postId": "123e4567-e89b-12d3-a456-426614174000",
            "parentId": "  ",
            "authorName": "a",
            "content": " 좋은 글 감사합니다 "
        }))
        .unwrap();
        let comment = request.validate().unwrap();
        assert_eq!(comment.parent_id, None);
        assert_eq!(comment.author_name, ANONYMOUS_AUTHOR);
        assert_eq!(comment.content, "좋은 글 감사합니다");

        let bad_parent: CreateCommentRequest = serde_json::from_value(json!({
            "postId": "123e4567-e89b-12d3-a456-426614174000",
            "parentId": "nope",
            "content": "x"
        }))
        .unwrap();
        assert!(bad_parent.validate().is_err());

        let too_long = CreateCommentRequest {
            post_id: Some("123e4567-e89b-12d3-a456-426614174000".to_string()),
            content: Some("가".repeat(MAX_COMMENT_CHARS + 1)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        assert!(CreateCommentRequest::default().validate().is_err());
    }

    #[test]
    fn test_adoption_award() {
        assert_eq!(adoption_award(false), (80, "채택 답변"));
        assert_eq!(adoption_award(true), (100, "채택 답변(인증 가산 포함)"));
    }

    #[test]
    fn test_adopt_request() {
        let request = AdoptRequest {
            post_id: Some("123e4567-e89b-12d3-a456-426614174000".to_string()),
            comment_id: Some("bad".to_string()),
            adopter_name: Some("  ".to_string()),
        };
        assert!(request.ids().is_err());
        assert!(request.adopter().is_none());
        assert_eq!(selected_author_name(Some("  ")), ANONYMOUS_AUTHOR);
    }
}
