use serde::Serialize;

use super::post::PostPreview;
use crate::catalog::{BoardInfo, ExamInfo};

pub const BOARD_PREVIEW_LIMIT: i64 = 3;

/// A catalog board with its latest posts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardOverview {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub posts: Vec<PostPreview>,
}

impl BoardOverview {
    pub fn new(board: &BoardInfo, posts: Vec<PostPreview>) -> Self {
        BoardOverview {
            slug: board.slug,
            name: board.name,
            description: board.description,
            posts,
        }
    }
}

/// Catalog entry without its boards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub board_count: usize,
}

impl From<&ExamInfo> for ExamSummary {
    fn from(exam: &ExamInfo) -> Self {
        ExamSummary {
            slug: exam.slug,
            name: exam.name,
            description: exam.description,
            board_count: exam.boards.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_exam;
    use serde_json::json;

    #[test]
    fn test_board_overview_shape() {
        let exam = find_exam("transfer").unwrap();
        let board = exam.board("study-qa").unwrap();
        let value = serde_json::to_value(BoardOverview::new(board, Vec::new())).unwrap();

        assert_eq!(value["slug"], json!("study-qa"));
        assert_eq!(value["posts"], json!([]));

        let summary = serde_json::to_value(ExamSummary::from(exam)).unwrap();
        assert_eq!(summary["boardCount"], json!(5));
    }
}
