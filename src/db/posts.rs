use std::collections::HashMap;

use tokio_postgres::Row;
use tracing::{info, warn};
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::post::{NewPost, PopularPost, Post, PostPreview, PostSummary};
use crate::models::{stored_author_name, stored_view_count};

/// Where a post lives, used for gating and authorship checks.
#[derive(Debug, Clone)]
pub struct PostContext {
    pub id: Uuid,
    pub board_id: Uuid,
    pub author_name: String,
    pub exam_slug: String,
}

const POST_COLUMNS: &str = "id, board_id, author_name, title, content, post_type, view_count, created_at";

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get(0),
        board_id: row.get(1),
        author_name: stored_author_name(row.get(2)),
        title: row.get(3),
        content: row.get(4),
        post_type: row.get(5),
        view_count: stored_view_count(row.get(6)),
        created_at: row.get(7),
    }
}

impl Database {
    pub async fn create_post(&self, board_id: Uuid, post: &NewPost, post_type: &str) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            r#"
            INSERT INTO posts (board_id, author_name, title, content, post_type, view_count)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        let row = client
            .query_one(&query, &[&board_id, &post.author_name, &post.title, &post.content, &post_type])
            .await?;

        let created = post_from_row(&row);
        info!("Created post with id: {}", created.id);
        Ok(created)
    }

    pub async fn find_post_context(&self, post_id: Uuid) -> Result<Option<PostContext>, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_opt(
                r#"
                SELECT p.id, p.board_id, p.author_name, e.slug
                FROM posts p
                JOIN boards b ON b.id = p.board_id
                JOIN exams e ON e.id = b.exam_id
                WHERE p.id = $1
                "#,
                &[&post_id],
            )
            .await?;

        Ok(row.map(|row| PostContext {
            id: row.get(0),
            board_id: row.get(1),
            author_name: stored_author_name(row.get(2)),
            exam_slug: row.get(3),
        }))
    }

    /// Posts of a board, newest first, with comment and like counts.
    pub async fn list_board_posts(&self, board_id: Uuid) -> Result<Vec<PostSummary>, ApiError> {
        let client = self.get_connection().await?;
        let rows = client
            .query(
                r#"
                SELECT p.id, p.title, p.author_name, p.created_at, p.view_count,
                       (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
                       (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id)
                FROM posts p
                WHERE p.board_id = $1
                ORDER BY p.created_at DESC
                "#,
                &[&board_id],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| PostSummary {
                id: row.get(0),
                title: row.get(1),
                author_name: stored_author_name(row.get(2)),
                created_at: row.get(3),
                view_count: stored_view_count(row.get(4)),
                comment_count: row.get(5),
                like_count: row.get(6),
            })
            .collect())
    }

    /// Latest `limit` posts of every board of an exam, keyed by board slug.
    pub async fn latest_posts_by_board(
        &self,
        exam_slug: &str,
        limit: i64,
    ) -> Result<HashMap<String, Vec<PostPreview>>, ApiError> {
        let client = self.get_connection().await?;
        let rows = client
            .query(
                r#"
                SELECT board_slug, id, title, created_at
                FROM (
                    SELECT b.slug AS board_slug, p.id, p.title, p.created_at,
                           ROW_NUMBER() OVER (PARTITION BY p.board_id ORDER BY p.created_at DESC) AS position
                    FROM posts p
                    JOIN boards b ON b.id = p.board_id
                    JOIN exams e ON e.id = b.exam_id
                    WHERE e.slug = $1
                ) ranked
                WHERE position <= $2
                ORDER BY board_slug, created_at DESC
                "#,
                &[&exam_slug, &limit],
            )
            .await?;

        let mut previews: HashMap<String, Vec<PostPreview>> = HashMap::new();
        for row in &rows {
            previews.entry(row.get(0)).or_default().push(PostPreview {
                id: row.get(1),
                title: row.get(2),
                created_at: row.get(3),
            });
        }
        Ok(previews)
    }

    pub async fn get_board_post(&self, board_id: Uuid, post_id: Uuid) -> Result<Option<Post>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM posts WHERE id = $1 AND board_id = $2", POST_COLUMNS);
        let row = client.query_opt(&query, &[&post_id, &board_id]).await?;
        Ok(row.as_ref().map(post_from_row))
    }

    /// Atomic increment. Failures are logged and swallowed: a lost view is
    /// preferable to a failed page.
    pub async fn increment_view_count(&self, post_id: Uuid) {
        let result = async {
            let client = self.get_connection().await?;
            client
                .execute("UPDATE posts SET view_count = COALESCE(view_count, 0) + 1 WHERE id = $1", &[&post_id])
                .await?;
            Ok::<(), ApiError>(())
        }
        .await;

        if let Err(e) = result {
            warn!("View count update failed for post {}: {}", post_id, e);
        }
    }

    pub async fn count_likes(&self, post_id: Uuid) -> Result<i64, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM post_likes WHERE post_id = $1", &[&post_id])
            .await?;
        Ok(row.get(0))
    }

    /// Removes the like when present, otherwise adds it. Returns the new state.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;

        let removed = client
            .execute("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2", &[&post_id, &user_id])
            .await?;
        if removed > 0 {
            info!("User {} unliked post {}", user_id, post_id);
            return Ok(false);
        }

        client
            .execute(
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                &[&post_id, &user_id],
            )
            .await?;
        info!("User {} liked post {}", user_id, post_id);
        Ok(true)
    }

    /// The latest `window` posts of an exam with their engagement counts.
    pub async fn popular_candidates(&self, exam_slug: &str, window: i64) -> Result<Vec<PopularPost>, ApiError> {
        let client = self.get_connection().await?;
        let rows = client
            .query(
                r#"
                SELECT p.id, p.title, b.slug, b.name, p.view_count,
                       (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
                       (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id)
                FROM posts p
                JOIN boards b ON b.id = p.board_id
                JOIN exams e ON e.id = b.exam_id
                WHERE e.slug = $1
                ORDER BY p.created_at DESC
                LIMIT $2
                "#,
                &[&exam_slug, &window],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| PopularPost {
                id: row.get(0),
                title: row.get(1),
                board_slug: row.get(2),
                board_name: row.get(3),
                view_count: stored_view_count(row.get(4)),
                comment_count: row.get(5),
                like_count: row.get(6),
            })
            .collect())
    }
}
