use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::ranking::{RankingSeed, RankingUpsert, VoteStatus};

const SEED_COLUMNS: &str = "id, exam_slug, subject, instructor_name, rank, confidence, source_type, is_seed";

fn seed_from_row(row: &Row) -> RankingSeed {
    RankingSeed {
        id: row.get(0),
        exam_slug: row.get(1),
        subject: row.get(2),
        instructor_name: row.get(3),
        rank: row.get(4),
        confidence: row.get(5),
        source_type: row.get(6),
        is_seed: row.get(7),
    }
}

/// A capped listing keeps the first rows by subject then name; the board is
/// ranked after aggregation.
fn seed_listing_query() -> String {
    format!(
        r#"
        SELECT {}
        FROM instructor_rankings
        WHERE exam_slug = $1
        ORDER BY subject ASC, instructor_name ASC
        LIMIT $2
        "#,
        SEED_COLUMNS
    )
}

impl Database {
    /// Instructor rows of an exam, at most `limit` of them when given.
    pub async fn list_ranking_seeds(&self, exam_slug: &str, limit: Option<i64>) -> Result<Vec<RankingSeed>, ApiError> {
        let client = self.get_connection().await?;
        let rows = client.query(&seed_listing_query(), &[&exam_slug, &limit]).await?;
        Ok(rows.iter().map(seed_from_row).collect())
    }

    /// Real votes per instructor name.
    pub async fn vote_counts(&self, exam_slug: &str) -> Result<HashMap<String, i64>, ApiError> {
        let client = self.get_connection().await?;
        let rows = client
            .query(
                "SELECT instructor_name, COUNT(*) FROM instructor_votes WHERE exam_slug = $1 GROUP BY instructor_name",
                &[&exam_slug],
            )
            .await?;
        Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
    }

    pub async fn instructor_exists(&self, exam_slug: &str, instructor_name: &str) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM instructor_rankings WHERE exam_slug = $1 AND instructor_name = $2)",
                &[&exam_slug, &instructor_name],
            )
            .await?;
        Ok(row.get(0))
    }

    pub async fn vote_status(&self, exam_slug: &str, voter_name: &str) -> Result<VoteStatus, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_opt(
                "SELECT instructor_name, created_at FROM instructor_votes WHERE exam_slug = $1 AND voter_name = $2",
                &[&exam_slug, &voter_name],
            )
            .await?;

        Ok(match row {
            Some(row) => VoteStatus {
                has_voted: true,
                instructor_name: Some(row.get(0)),
                voted_at: Some(row.get::<_, DateTime<Utc>>(1)),
            },
            None => VoteStatus::none(),
        })
    }

    /// Records a ballot. A voter who already voted for the exam hits the
    /// unique constraint, surfaced as a conflict.
    pub async fn insert_vote(&self, exam_slug: &str, instructor_name: &str, voter_name: &str) -> Result<(), ApiError> {
        let client = self.get_connection().await?;
        client
            .execute(
                "INSERT INTO instructor_votes (exam_slug, instructor_name, voter_name) VALUES ($1, $2, $3)",
                &[&exam_slug, &instructor_name, &voter_name],
            )
            .await?;

        info!("Recorded vote for {} in {}", instructor_name, exam_slug);
        Ok(())
    }

    /// `(rank, confidence)` of an existing instructor row.
    pub async fn find_ranking_row(
        &self,
        exam_slug: &str,
        subject: &str,
        instructor_name: &str,
    ) -> Result<Option<(i32, Option<i32>)>, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_opt(
                r#"
                SELECT rank, confidence FROM instructor_rankings
                WHERE exam_slug = $1 AND subject = $2 AND instructor_name = $3
                "#,
                &[&exam_slug, &subject, &instructor_name],
            )
            .await?;
        Ok(row.map(|row| (row.get(0), row.get(1))))
    }

    pub async fn max_rank(&self, exam_slug: &str) -> Result<Option<i32>, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_one("SELECT MAX(rank) FROM instructor_rankings WHERE exam_slug = $1", &[&exam_slug])
            .await?;
        Ok(row.get(0))
    }

    pub async fn upsert_ranking(&self, exam_slug: &str, ranking: &RankingUpsert) -> Result<(), ApiError> {
        let client = self.get_connection().await?;
        client
            .execute(
                r#"
                INSERT INTO instructor_rankings
                    (exam_slug, subject, instructor_name, rank, trend, confidence, source_type, is_seed)
                VALUES ($1, $2, $3, $4, '-', $5, 'admin', FALSE)
                ON CONFLICT (exam_slug, subject, instructor_name) DO UPDATE SET
                    rank = EXCLUDED.rank,
                    trend = EXCLUDED.trend,
                    confidence = EXCLUDED.confidence,
                    source_type = EXCLUDED.source_type,
                    is_seed = EXCLUDED.is_seed,
                    updated_at = NOW()
                "#,
                &[
                    &exam_slug,
                    &ranking.subject,
                    &ranking.instructor_name,
                    &ranking.rank,
                    &ranking.confidence,
                ],
            )
            .await?;

        info!(
            "Upserted ranking {}/{}/{} at rank {}",
            exam_slug, ranking.subject, ranking.instructor_name, ranking.rank
        );
        Ok(())
    }

    /// Removes an instructor row together with the votes cast for it.
    /// Returns false when no such row exists.
    pub async fn delete_ranking(&self, exam_slug: &str, id: Uuid) -> Result<bool, ApiError> {
        let mut client = self.get_connection().await?;
        let transaction = client.transaction().await?;

        let row = transaction
            .query_opt(
                "DELETE FROM instructor_rankings WHERE id = $1 AND exam_slug = $2 RETURNING instructor_name",
                &[&id, &exam_slug],
            )
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let instructor_name: String = row.get(0);

        let votes = transaction
            .execute(
                "DELETE FROM instructor_votes WHERE exam_slug = $1 AND instructor_name = $2",
                &[&exam_slug, &instructor_name],
            )
            .await?;

        transaction.commit().await?;

        info!("Deleted ranking {} ({}) and {} votes", id, instructor_name, votes);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_limit_applies_to_subject_order() {
        let query: Vec<String> = seed_listing_query()
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        let order = query.iter().position(|line| line.starts_with("ORDER BY"));
        let limit = query.iter().position(|line| line.starts_with("LIMIT"));

        assert_eq!(order.map(|i| query[i].as_str()), Some("ORDER BY subject ASC, instructor_name ASC"));
        assert!(order < limit);
        assert!(!query.iter().any(|line| line.contains("rank ASC")));
    }
}
