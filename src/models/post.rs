use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::comment::CommentNode;
use super::{char_len, lenient_string, parse_uuid, resolve_author_name, trimmed};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 20_000;
pub const POPULAR_WINDOW: i64 = 120;
pub const POPULAR_LIMIT: usize = 5;

/// Post entity as stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub board_id: Uuid,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub post_type: String,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Row of a board listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub view_count: i32,
    pub comment_count: i64,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<CommentNode>,
    pub like_count: i64,
    pub adopted_comment_id: Option<Uuid>,
}

/// Latest post shown under a board on the exam page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPreview {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Candidate for the popular list, with the board it was posted on.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopularPost {
    pub id: Uuid,
    pub title: String,
    pub board_slug: String,
    pub board_name: String,
    pub comment_count: i64,
    pub like_count: i64,
    pub view_count: i32,
}

impl PopularPost {
    pub fn score(&self) -> i64 {
        popularity_score(self.like_count, self.comment_count, self.view_count)
    }
}

/// `likes*3 + comments*2 + min(10, views/20)`
pub fn popularity_score(likes: i64, comments: i64, views: i32) -> i64 {
    let view_bonus = (i64::from(views.max(0)) / 20).min(10);
    likes * 3 + comments * 2 + view_bonus
}

/// Highest scoring posts first; equal scores keep their incoming (newest first) order.
pub fn pick_popular(mut candidates: Vec<PopularPost>, limit: usize) -> Vec<PopularPost> {
    candidates.sort_by_key(|post| std::cmp::Reverse(post.score()));
    candidates.truncate(limit);
    candidates
}

/// Request structure for creating a new post
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub exam_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub board_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
}

/// Post body ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author_name: String,
    pub title: String,
    pub content: String,
}

impl CreatePostRequest {
    /// Exam and board slugs, filling whichever is missing from a
    /// `/c/<exam>/<board>` referer path.
    pub fn board_location(&self, referer: Option<&str>) -> Result<(String, String), String> {
        let mut exam = trimmed(&self.exam_slug);
        let mut board = trimmed(&self.board_slug);

        if exam.is_empty() || board.is_empty() {
            if let Some((referer_exam, referer_board)) = referer.and_then(board_from_referer) {
                if exam.is_empty() {
                    exam = referer_exam;
                }
                if board.is_empty() {
                    board = referer_board;
                }
            }
        }

        if exam.is_empty() || board.is_empty() {
            return Err("게시판 정보가 없습니다.".to_string());
        }
        Ok((exam, board))
    }

    /// Validate title and content
    pub fn validate(&self) -> Result<NewPost, String> {
        let title = trimmed(&self.title);
        if title.is_empty() {
            return Err("제목을 입력해 주세요.".to_string());
        }
        if char_len(&title) > MAX_TITLE_CHARS {
            return Err(format!("제목은 {}자 이하로 입력해 주세요.", MAX_TITLE_CHARS));
        }

        let content = trimmed(&self.content);
        if content.is_empty() {
            return Err("내용을 입력해 주세요.".to_string());
        }
        if char_len(&content) > MAX_CONTENT_CHARS {
            return Err(format!("내용은 {}자 이하로 입력해 주세요.", MAX_CONTENT_CHARS));
        }

        Ok(NewPost {
            author_name: resolve_author_name(&self.author_name),
            title,
            content,
        })
    }
}

/// Extracts `(exam, board)` from a referer such as `https://site/c/transfer/qa/123`.
pub fn board_from_referer(referer: &str) -> Option<(String, String)> {
    let path_start = match referer.find("://") {
        Some(scheme_end) => {
            let rest = &referer[scheme_end + 3..];
            scheme_end + 3 + rest.find('/')?
        }
        None => 0,
    };
    let path = referer[path_start..].split(['?', '#']).next()?;

    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if segment != "c" {
            continue;
        }
        let exam = segments.next().filter(|s| !s.is_empty())?;
        let board = segments.next().filter(|s| !s.is_empty())?;
        let exam = urlencoding::decode(exam).ok()?.into_owned();
        let board = urlencoding::decode(board).ok()?.into_owned();
        return Some((exam, board));
    }
    None
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub post_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
}

impl LikeRequest {
    pub fn post_id(&self) -> Option<Uuid> {
        parse_uuid(&trimmed(&self.post_id))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        parse_uuid(&trimmed(&self.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn popular(id: u128, likes: i64, comments: i64, views: i32) -> PopularPost {
        PopularPost {
            id: Uuid::from_u128(id),
            title: format!("글 {}", id),
            board_slug: "qa".to_string(),
            board_name: "Q&A".to_string(),
            comment_count: comments,
            like_count: likes,
            view_count: views,
        }
    }

    #[test]
    fn test_popularity_score() {
        assert_eq!(popularity_score(2, 3, 59), 6 + 6 + 2);
        assert_eq!(popularity_score(0, 0, 10_000), 10);
        assert_eq!(popularity_score(0, 0, 19), 0);
        assert_eq!(popularity_score(1, 0, -5), 3);
    }

    #[test]
    fn test_pick_popular_keeps_top_five() {
        let candidates = vec![
            popular(1, 0, 0, 0),
            popular(2, 5, 0, 0),
            popular(3, 1, 1, 0),
            popular(4, 5, 0, 0),
            popular(5, 0, 0, 400),
            popular(6, 0, 1, 0),
            popular(7, 2, 0, 0),
        ];
        let top = pick_popular(candidates, POPULAR_LIMIT);
        let ids: Vec<u128> = top.iter().map(|p| p.id.as_u128()).collect();

        assert_eq!(ids, vec![2, 4, 5, 7, 3]);
    }

    #[test]
    fn test_board_from_referer() {
        assert_eq!(
            board_from_referer("https://hapgyeokpan.kr/c/transfer/qa"),
            Some(("transfer".to_string(), "qa".to_string()))
        );
        assert_eq!(
            board_from_referer("https://hapgyeokpan.kr/c/transfer/study-qa/write?draft=1"),
            Some(("transfer".to_string(), "study-qa".to_string()))
        );
        assert_eq!(
            board_from_referer("http://localhost:3000/c/cpa/%EC%9E%90%EB%A3%8C"),
            Some(("cpa".to_string(), "자료".to_string()))
        );
        assert_eq!(board_from_referer("https://hapgyeokpan.kr/c/transfer"), None);
        assert_eq!(board_from_referer("https://hapgyeokpan.kr/transfer"), None);
    }

    #[test]
    fn test_board_location_fills_missing_parts() {
        let request: CreatePostRequest = serde_json::from_value(json!({ "boardSlug": "free" })).unwrap();
        assert_eq!(
            request.board_location(Some("https://hapgyeokpan.kr/c/transfer/qa")).unwrap(),
            ("transfer".to_string(), "free".to_string())
        );
        assert!(request.board_location(None).is_err());
    }

    #[test]
    fn test_create_post_request_validation() {
        let valid: CreatePostRequest = serde_json::from_value(json!({
            "title": " 편입 영어 질문 ",
            "content": "문법 문제 풀이 부탁드립니다.",
            "authorName": "수험생"
        }))
        .unwrap();
        let post = valid.validate().unwrap();
        assert_eq!(post.title, "편입 영어 질문");
        assert_eq!(post.author_name, "수험생");

        let no_title: CreatePostRequest = serde_json::from_value(json!({ "content": "x" })).unwrap();
        assert_eq!(no_title.validate().unwrap_err(), "제목을 입력해 주세요.");

        let no_content: CreatePostRequest = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert_eq!(no_content.validate().unwrap_err(), "내용을 입력해 주세요.");

        let long_title = CreatePostRequest {
            title: Some("가".repeat(MAX_TITLE_CHARS + 1)),
            content: Some("본문".to_string()),
            ..Default::default()
        };
        assert!(long_title.validate().is_err());

        let long_content = CreatePostRequest {
            title: Some("제목".to_string()),
            content: Some("a".repeat(MAX_CONTENT_CHARS + 1)),
            ..Default::default()
        };
        assert!(long_content.validate().is_err());
    }

    #[test]
    fn test_like_request_ids() {
        let request: LikeRequest = serde_json::from_value(json!({
            "postId": "123e4567-e89b-12d3-a456-426614174000",
            "userId": 7
        }))
        .unwrap();
        assert!(request.post_id().is_some());
        assert!(request.user_id().is_none());
    }
}
