use tokio_postgres::Row;
use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::cutoff::{CutoffScore, CutoffUpsert};

const CUTOFF_COLUMNS: &str = "id, exam_slug, university, major, year, score_band, note, source";

fn cutoff_from_row(row: &Row) -> CutoffScore {
    CutoffScore {
        id: row.get(0),
        exam_slug: row.get(1),
        university: row.get(2),
        major: row.get(3),
        year: row.get(4),
        score_band: row.get(5),
        note: row.get(6),
        source: row.get(7),
    }
}

impl Database {
    /// Most recent reports for the public listing.
    pub async fn latest_cutoffs(&self, exam_slug: &str, limit: i64) -> Result<Vec<CutoffScore>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "SELECT {} FROM cutoff_scores WHERE exam_slug = $1 ORDER BY year DESC, updated_at DESC LIMIT $2",
            CUTOFF_COLUMNS
        );
        let rows = client.query(&query, &[&exam_slug, &limit]).await?;
        Ok(rows.iter().map(cutoff_from_row).collect())
    }

    /// Every report of an exam, for the admin console.
    pub async fn list_cutoffs(&self, exam_slug: &str) -> Result<Vec<CutoffScore>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "SELECT {} FROM cutoff_scores WHERE exam_slug = $1 ORDER BY year DESC, university ASC, major ASC",
            CUTOFF_COLUMNS
        );
        let rows = client.query(&query, &[&exam_slug]).await?;
        Ok(rows.iter().map(cutoff_from_row).collect())
    }

    pub async fn upsert_cutoff(&self, exam_slug: &str, cutoff: &CutoffUpsert) -> Result<(), ApiError> {
        let client = self.get_connection().await?;
        client
            .execute(
                r#"
                INSERT INTO cutoff_scores (exam_slug, university, major, year, score_band, note, source)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (exam_slug, university, major, year) DO UPDATE SET
                    score_band = EXCLUDED.score_band,
                    note = EXCLUDED.note,
                    source = EXCLUDED.source,
                    updated_at = NOW()
                "#,
                &[
                    &exam_slug,
                    &cutoff.university,
                    &cutoff.major,
                    &cutoff.year,
                    &cutoff.result_type,
                    &cutoff.note,
                    &cutoff.input_basis,
                ],
            )
            .await?;

        info!(
            "Upserted cutoff {}/{}/{}/{}",
            exam_slug, cutoff.university, cutoff.major, cutoff.year
        );
        Ok(())
    }

    pub async fn delete_cutoff(&self, exam_slug: &str, id: Uuid) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;
        let deleted = client
            .execute("DELETE FROM cutoff_scores WHERE id = $1 AND exam_slug = $2", &[&id, &exam_slug])
            .await?;

        info!("Deleted {} cutoff rows for id {}", deleted, id);
        Ok(deleted > 0)
    }
}
