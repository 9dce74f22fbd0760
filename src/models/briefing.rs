use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const BRIEFING_LIMIT: i64 = 10;

/// Daily news/notice summary for an exam, newest first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyBriefing {
    pub id: Uuid,
    pub exam_slug: String,
    pub title: String,
    pub summary: String,
    pub source_label: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_column_names() {
        let briefing = DailyBriefing {
            id: Uuid::nil(),
            exam_slug: "transfer".to_string(),
            title: "2026 편입 일정 공지".to_string(),
            summary: "주요 대학 원서 접수 일정".to_string(),
            source_label: None,
            published_at: DateTime::parse_from_rfc3339("2025-12-01T00:00:00Z").unwrap().with_timezone(&Utc),
        };
        let value = serde_json::to_value(briefing).unwrap();

        assert_eq!(value["exam_slug"], json!("transfer"));
        assert_eq!(value["source_label"], json!(null));
        assert_eq!(value["published_at"], json!("2025-12-01T00:00:00Z"));
    }
}
