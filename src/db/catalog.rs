use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::catalog::{board_name, find_exam};
use crate::error::ApiError;

impl Database {
    /// Makes sure the exam and board rows exist, creating them from the static
    /// catalog (or the bare slugs) on first use. Returns the board id.
    pub async fn ensure_board(&self, exam_slug: &str, board_slug: &str) -> Result<Uuid, ApiError> {
        let exam = find_exam(exam_slug);
        let exam_name = exam.map(|e| e.name).unwrap_or(exam_slug);
        let exam_description = exam.map(|e| e.description);
        let board = exam.and_then(|e| e.board(board_slug));
        let board_title = board_name(exam_slug, board_slug);
        let board_description = board.map(|b| b.description);

        let client = self.get_connection().await?;

        let exam_row = client
            .query_one(
                r#"
                INSERT INTO exams (slug, name, description)
                VALUES ($1, $2, $3)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description
                RETURNING id
                "#,
                &[&exam_slug, &exam_name, &exam_description],
            )
            .await?;
        let exam_id: Uuid = exam_row.get(0);

        let board_row = client
            .query_one(
                r#"
                INSERT INTO boards (exam_id, slug, name, description)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (exam_id, slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description
                RETURNING id
                "#,
                &[&exam_id, &board_slug, &board_title, &board_description],
            )
            .await?;
        let board_id: Uuid = board_row.get(0);

        info!("Resolved board {}/{} to {}", exam_slug, board_slug, board_id);
        Ok(board_id)
    }

    /// Board id for a slug pair, without creating anything.
    pub async fn find_board_id(&self, exam_slug: &str, board_slug: &str) -> Result<Option<Uuid>, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_opt(
                r#"
                SELECT b.id
                FROM boards b
                JOIN exams e ON e.id = b.exam_id
                WHERE e.slug = $1 AND b.slug = $2
                "#,
                &[&exam_slug, &board_slug],
            )
            .await?;

        Ok(row.map(|row| row.get(0)))
    }
}
