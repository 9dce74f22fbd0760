use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const LEDGER_LIMIT: usize = 30;

/// Append-only point ledger entry. Serialized with the stored column names.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub receiver_name: String,
    pub source: String,
    pub amount: i32,
    pub meta: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub points: i64,
    pub computed_points: i64,
    pub entries: Vec<LedgerEntry>,
}

/// Merges the entries found by profile id and by display name.
///
/// Duplicates (same entry id) are collapsed, the 30 most recent are kept and
/// their sum is used when the profile has no cached total.
pub fn summarize_ledger(
    by_profile: Vec<LedgerEntry>,
    by_name: Vec<LedgerEntry>,
    cached_points: Option<i64>,
) -> LedgerSummary {
    let mut merged: HashMap<Uuid, LedgerEntry> = HashMap::new();
    for entry in by_profile.into_iter().chain(by_name) {
        merged.insert(entry.id, entry);
    }

    let mut entries: Vec<LedgerEntry> = merged.into_values().collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    entries.truncate(LEDGER_LIMIT);

    let computed_points: i64 = entries.iter().map(|entry| i64::from(entry.amount)).sum();

    LedgerSummary {
        points: cached_points.unwrap_or(computed_points),
        computed_points,
        entries,
    }
}

/// Human label of a stored verification level.
pub fn verification_label(level: Option<&str>) -> &'static str {
    match level {
        Some("transfer_passer") => "편입 합격자",
        Some("cpa_first_passer") => "CPA 1차 합격",
        Some("cpa_accountant") => "현직 회계사",
        _ => "미인증",
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsQuery {
    pub nickname: Option<String>,
    pub user_id: Option<String>,
}

impl PointsQuery {
    pub fn nickname(&self) -> String {
        super::trimmed(&self.nickname)
    }

    pub fn user_id(&self) -> String {
        super::trimmed(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsView {
    pub owner_name: String,
    pub points: i64,
    pub verification_level: &'static str,
    pub ledger: Vec<LedgerEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(id: u128, amount: i32, hours_ago: i64) -> LedgerEntry {
        let now = DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z").unwrap().with_timezone(&Utc);
        LedgerEntry {
            id: Uuid::from_u128(id),
            receiver_name: "합격생".to_string(),
            source: "채택 답변".to_string(),
            amount,
            meta: None,
            created_at: now - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_merge_dedupes_and_orders() {
        let by_profile = vec![entry(1, 80, 1), entry(2, 100, 5)];
        let by_name = vec![entry(2, 100, 5), entry(3, 80, 3)];
        let summary = summarize_ledger(by_profile, by_name, None);

        let ids: Vec<u128> = summary.entries.iter().map(|e| e.id.as_u128()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(summary.computed_points, 260);
        assert_eq!(summary.points, 260);
    }

    #[test]
    fn test_cached_points_win() {
        let summary = summarize_ledger(vec![entry(1, 80, 1)], vec![], Some(500));
        assert_eq!(summary.points, 500);
        assert_eq!(summary.computed_points, 80);

        let zero = summarize_ledger(vec![entry(1, 80, 1)], vec![], Some(0));
        assert_eq!(zero.points, 0);
    }

    #[test]
    fn test_keeps_thirty_most_recent() {
        let by_profile: Vec<LedgerEntry> = (0..30).map(|i| entry(i, 1, i as i64)).collect();
        let by_name: Vec<LedgerEntry> = (30..45).map(|i| entry(i, 10, i as i64)).collect();
        let summary = summarize_ledger(by_profile, by_name, None);

        assert_eq!(summary.entries.len(), LEDGER_LIMIT);
        assert_eq!(summary.computed_points, 30);
        assert!(summary.entries.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_empty_ledger() {
        let summary = summarize_ledger(vec![], vec![], None);
        assert!(summary.entries.is_empty());
        assert_eq!(summary.points, 0);
    }

    #[test]
    fn test_verification_labels() {
        assert_eq!(verification_label(Some("transfer_passer")), "편입 합격자");
        assert_eq!(verification_label(Some("cpa_first_passer")), "CPA 1차 합격");
        assert_eq!(verification_label(Some("cpa_accountant")), "현직 회계사");
        assert_eq!(verification_label(Some("none")), "미인증");
        assert_eq!(verification_label(None), "미인증");
    }
}
