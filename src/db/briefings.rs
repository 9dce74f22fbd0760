use super::Database;
use crate::error::ApiError;
use crate::models::briefing::DailyBriefing;

impl Database {
    pub async fn latest_briefings(&self, exam_slug: &str, limit: i64) -> Result<Vec<DailyBriefing>, ApiError> {
        let client = self.get_connection().await?;
        let rows = client
            .query(
                r#"
                SELECT id, exam_slug, title, summary, source_label, published_at
                FROM daily_briefings
                WHERE exam_slug = $1
                ORDER BY published_at DESC
                LIMIT $2
                "#,
                &[&exam_slug, &limit],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| DailyBriefing {
                id: row.get(0),
                exam_slug: row.get(1),
                title: row.get(2),
                summary: row.get(3),
                source_label: row.get(4),
                published_at: row.get(5),
            })
            .collect())
    }
}
