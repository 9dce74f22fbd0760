use serde_json::json;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::comment::{Comment, NewComment};
use crate::models::stored_author_name;

/// Everything written when an answer is adopted.
#[derive(Debug, Clone)]
pub struct AdoptionRecord {
    pub post_id: Uuid,
    pub comment_id: Uuid,
    pub adopter_name: String,
    pub selected_author_name: String,
    pub profile_id: Option<Uuid>,
    pub points: i32,
    pub source: &'static str,
}

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_name, content, created_at";

fn comment_from_row(row: &Row) -> Comment {
    Comment {
        id: row.get(0),
        post_id: row.get(1),
        parent_id: row.get(2),
        author_name: stored_author_name(row.get(3)),
        content: row.get(4),
        created_at: row.get(5),
    }
}

impl Database {
    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            r#"
            INSERT INTO comments (post_id, parent_id, author_name, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        );

        let row = client
            .query_one(
                &query,
                &[&comment.post_id, &comment.parent_id, &comment.author_name, &comment.content],
            )
            .await?;

        let created = comment_from_row(&row);
        info!("Created comment {} on post {}", created.id, created.post_id);
        Ok(created)
    }

    /// All comments of a post, oldest first.
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "SELECT {} FROM comments WHERE post_id = $1 ORDER BY created_at ASC",
            COMMENT_COLUMNS
        );
        let rows = client.query(&query, &[&post_id]).await?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    pub async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);
        let row = client.query_opt(&query, &[&comment_id]).await?;
        Ok(row.as_ref().map(comment_from_row))
    }

    pub async fn adopted_comment_id(&self, post_id: Uuid) -> Result<Option<Uuid>, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_opt("SELECT comment_id FROM answer_adoptions WHERE post_id = $1", &[&post_id])
            .await?;
        Ok(row.map(|row| row.get(0)))
    }

    /// Inserts the adoption, its ledger entry and the cached point increment in
    /// one transaction. A second adoption of the same post is a conflict.
    pub async fn record_adoption(&self, record: &AdoptionRecord) -> Result<(), ApiError> {
        let mut client = self.get_connection().await?;
        let transaction = client.transaction().await?;

        transaction
            .execute(
                r#"
                INSERT INTO answer_adoptions (post_id, comment_id, adopter_name, selected_author_name, points_awarded)
                VALUES ($1, $2, $3, $4, $5)
                "#,
                &[
                    &record.post_id,
                    &record.comment_id,
                    &record.adopter_name,
                    &record.selected_author_name,
                    &record.points,
                ],
            )
            .await
            .map_err(|e| match e.code() {
                Some(&SqlState::UNIQUE_VIOLATION) => ApiError::conflict("이미 채택된 답변이 있습니다."),
                _ => ApiError::from(e),
            })?;

        let meta = json!({ "post_id": record.post_id, "comment_id": record.comment_id });
        transaction
            .execute(
                r#"
                INSERT INTO point_ledger (profile_id, receiver_name, source, amount, meta)
                VALUES ($1, $2, $3, $4, $5)
                "#,
                &[
                    &record.profile_id,
                    &record.selected_author_name,
                    &record.source,
                    &record.points,
                    &meta,
                ],
            )
            .await?;

        if let Some(profile_id) = record.profile_id {
            transaction
                .execute(
                    "UPDATE profiles SET points = COALESCE(points, 0) + $2, updated_at = NOW() WHERE id = $1",
                    &[&profile_id, &record.points],
                )
                .await?;
        }

        transaction.commit().await?;

        info!(
            "Adopted comment {} on post {} ({} points to {})",
            record.comment_id, record.post_id, record.points, record.selected_author_name
        );
        Ok(())
    }
}
