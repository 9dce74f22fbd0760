use std::cmp::Ordering;
use std::collections::HashMap;

use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{finite_number, lenient_string, normalize_text, trimmed};

/// Instructor row as stored, before real votes are folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingSeed {
    pub id: Uuid,
    pub exam_slug: String,
    pub subject: String,
    pub instructor_name: String,
    pub rank: i32,
    pub confidence: Option<i32>,
    pub source_type: Option<String>,
    pub is_seed: bool,
}

/// A seed after aggregation: totals, final position and share.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedInstructor {
    pub seed: RankingSeed,
    pub rank: usize,
    pub initial_votes: i64,
    pub real_vote_count: i64,
    pub vote_count: i64,
    pub vote_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingBoard {
    pub total_votes: i64,
    pub entries: Vec<RankedInstructor>,
}

/// Folds real votes into the seeded confidence and re-ranks.
///
/// The total for an instructor is `max(0, confidence) + votes`. Ordering is by
/// total descending, then seeded rank ascending, then subject, then name, so the
/// result does not depend on the order the rows were read in. Subjects and
/// names are compared with the root locale collation. Percentages are
/// rounded to one decimal and are all zero when nobody has any votes.
pub fn aggregate_rankings(seeds: Vec<RankingSeed>, vote_counts: &HashMap<String, i64>) -> RankingBoard {
    let mut entries: Vec<RankedInstructor> = seeds
        .into_iter()
        .map(|seed| {
            let initial_votes = i64::from(seed.confidence.unwrap_or(0).max(0));
            let real_vote_count = vote_counts.get(&seed.instructor_name).copied().unwrap_or(0);
            RankedInstructor {
                rank: 0,
                initial_votes,
                real_vote_count,
                vote_count: initial_votes + real_vote_count,
                vote_percent: 0.0,
                seed,
            }
        })
        .collect();

    let collator = Collator::try_new(&Default::default(), CollatorOptions::new()).ok();
    entries.sort_by(|a, b| compare_entries(collator.as_ref(), a, b));

    let total_votes: i64 = entries.iter().map(|entry| entry.vote_count).sum();

    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
        entry.vote_percent = vote_percent(entry.vote_count, total_votes);
    }

    RankingBoard { total_votes, entries }
}

fn compare_entries(collator: Option<&Collator>, a: &RankedInstructor, b: &RankedInstructor) -> Ordering {
    b.vote_count
        .cmp(&a.vote_count)
        .then_with(|| a.seed.rank.cmp(&b.seed.rank))
        .then_with(|| collate(collator, &a.seed.subject, &b.seed.subject))
        .then_with(|| collate(collator, &a.seed.instructor_name, &b.seed.instructor_name))
}

/// Locale order, with code points deciding what the collation treats as equal.
fn collate(collator: Option<&Collator>, a: &str, b: &str) -> Ordering {
    collator
        .map(|collator| collator.compare(a, b))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.cmp(b))
}

pub fn vote_percent(votes: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let percent = votes as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

/// Tally of vote rows keyed by instructor name.
pub fn count_votes<I>(names: I) -> HashMap<String, i64>
where
    I: IntoIterator<Item = String>,
{
    let mut counts = HashMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
}

/// Public ranking row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingView {
    pub id: Uuid,
    pub exam_slug: String,
    pub subject: String,
    pub instructor_name: String,
    pub rank: usize,
    pub vote_count: i64,
    pub vote_percent: f64,
}

impl From<&RankedInstructor> for RankingView {
    fn from(entry: &RankedInstructor) -> Self {
        RankingView {
            id: entry.seed.id,
            exam_slug: entry.seed.exam_slug.clone(),
            subject: entry.seed.subject.clone(),
            instructor_name: entry.seed.instructor_name.clone(),
            rank: entry.rank,
            vote_count: entry.vote_count,
            vote_percent: entry.vote_percent,
        }
    }
}

/// Admin ranking row, exposing how the total was made up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRankingView {
    pub id: Uuid,
    pub subject: String,
    pub instructor_name: String,
    pub rank: usize,
    pub initial_rank: i32,
    pub initial_votes: i64,
    pub real_vote_count: i64,
    pub source_type: String,
    pub is_seed: bool,
    pub vote_count: i64,
    pub vote_percent: f64,
}

impl From<&RankedInstructor> for AdminRankingView {
    fn from(entry: &RankedInstructor) -> Self {
        AdminRankingView {
            id: entry.seed.id,
            subject: entry.seed.subject.clone(),
            instructor_name: entry.seed.instructor_name.clone(),
            rank: entry.rank,
            initial_rank: entry.seed.rank,
            initial_votes: entry.initial_votes,
            real_vote_count: entry.real_vote_count,
            source_type: entry.seed.source_type.clone().unwrap_or_else(|| "manual".to_string()),
            is_seed: entry.seed.is_seed,
            vote_count: entry.vote_count,
            vote_percent: entry.vote_percent,
        }
    }
}

/// A voter's existing ballot for one exam.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub instructor_name: Option<String>,
    pub voted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl VoteStatus {
    pub fn none() -> Self {
        VoteStatus { has_voted: false, instructor_name: None, voted_at: None }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub instructor_name: Option<String>,
}

impl VoteRequest {
    pub fn validate(&self) -> Result<String, String> {
        let name = trimmed(&self.instructor_name);
        if name.is_empty() {
            return Err("강사명을 선택해 주세요.".to_string());
        }
        Ok(name)
    }
}

/// Admin upsert of one instructor row.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingUpsertRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub initial_rank: Option<Value>,
    #[serde(default)]
    pub initial_votes: Option<Value>,
}

/// Values written by an admin upsert once defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingUpsert {
    pub subject: String,
    pub instructor_name: String,
    pub rank: i32,
    pub confidence: i32,
}

impl RankingUpsertRequest {
    pub fn validate(&self) -> Result<(String, String), String> {
        let subject = normalize_text(&self.subject, 40);
        let instructor_name = normalize_text(&self.instructor_name, 40);
        if subject.is_empty() || instructor_name.is_empty() {
            return Err("subject, instructorName이 필요합니다.".to_string());
        }
        Ok((subject, instructor_name))
    }

    /// Resolves rank and votes: explicit value, else the existing row, else the
    /// next free rank and zero votes.
    pub fn resolve(
        &self,
        subject: String,
        instructor_name: String,
        existing: Option<(i32, Option<i32>)>,
        max_rank: Option<i32>,
    ) -> RankingUpsert {
        let next_rank = (max_rank.unwrap_or(0) + 1).max(1);

        let rank = match finite_number(self.initial_rank.as_ref()) {
            Some(value) => clamp_round(value, 1),
            None => existing.map(|(rank, _)| rank).unwrap_or(next_rank).max(1),
        };
        let confidence = match finite_number(self.initial_votes.as_ref()) {
            Some(value) => clamp_round(value, 0),
            None => existing.and_then(|(_, votes)| votes).unwrap_or(0).max(0),
        };

        RankingUpsert { subject, instructor_name, rank, confidence }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RankingDeleteRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
}

fn clamp_round(value: f64, min: i32) -> i32 {
    (value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed(subject: &str, name: &str, rank: i32, confidence: Option<i32>) -> RankingSeed {
        RankingSeed {
            id: Uuid::new_v4(),
            exam_slug: "transfer".to_string(),
            subject: subject.to_string(),
            instructor_name: name.to_string(),
            rank,
            confidence,
            source_type: None,
            is_seed: true,
        }
    }

    fn sample() -> Vec<RankingSeed> {
        vec![
            seed("영어", "김영편", 1, Some(40)),
            seed("영어", "이보카", 2, Some(25)),
            seed("수학", "박미적", 3, Some(30)),
            seed("수학", "최선대", 4, None),
            seed("영어", "정독해", 5, Some(-5)),
        ]
    }

    fn names(board: &RankingBoard) -> Vec<String> {
        board.entries.iter().map(|e| e.seed.instructor_name.clone()).collect()
    }

    #[test]
    fn test_totals_and_ordering() {
        let votes = count_votes(vec!["이보카".to_string(), "이보카".to_string(), "최선대".to_string()]);
        let board = aggregate_rankings(sample(), &votes);

        assert_eq!(board.total_votes, 40 + 27 + 30 + 1);
        assert_eq!(names(&board), vec!["김영편", "박미적", "이보카", "최선대", "정독해"]);
        assert_eq!(board.entries.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

        let negative = &board.entries[4];
        assert_eq!(negative.initial_votes, 0);
        assert_eq!(negative.vote_count, 0);
    }

    #[test]
    fn test_tie_breaks() {
        let seeds = vec![
            seed("영어", "나강사", 2, Some(10)),
            seed("수학", "가강사", 2, Some(10)),
            seed("영어", "가강사", 1, Some(10)),
            seed("영어", "다강사", 2, Some(10)),
        ];
        let board = aggregate_rankings(seeds, &HashMap::new());
        let order: Vec<(String, String)> = board
            .entries
            .iter()
            .map(|e| (e.seed.subject.clone(), e.seed.instructor_name.clone()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("영어".to_string(), "가강사".to_string()),
                ("수학".to_string(), "가강사".to_string()),
                ("영어".to_string(), "나강사".to_string()),
                ("영어".to_string(), "다강사".to_string()),
            ]
        );
    }

    #[test]
    fn test_tie_break_uses_locale_order() {
        let seeds = vec![
            seed("영어", "Banana", 1, Some(5)),
            seed("영어", "apple", 1, Some(5)),
            seed("영어", "Apple", 1, Some(5)),
            seed("Math", "가강사", 1, Some(5)),
            seed("english", "가강사", 1, Some(5)),
        ];
        let board = aggregate_rankings(seeds, &HashMap::new());
        let order: Vec<(String, String)> = board
            .entries
            .iter()
            .map(|e| (e.seed.subject.clone(), e.seed.instructor_name.clone()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("english".to_string(), "가강사".to_string()),
                ("Math".to_string(), "가강사".to_string()),
                ("영어".to_string(), "apple".to_string()),
                ("영어".to_string(), "Apple".to_string()),
                ("영어".to_string(), "Banana".to_string()),
            ]
        );
    }

    #[test]
    fn test_permutation_invariance() {
        let votes = count_votes(vec!["정독해".to_string(), "박미적".to_string()]);
        let expected = aggregate_rankings(sample(), &votes);

        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);

        for seeds in [reversed, rotated] {
            let board = aggregate_rankings(seeds, &votes);
            assert_eq!(board.total_votes, expected.total_votes);
            assert_eq!(names(&board), names(&expected));
            let totals: Vec<i64> = board.entries.iter().map(|e| e.vote_count).collect();
            let expected_totals: Vec<i64> = expected.entries.iter().map(|e| e.vote_count).collect();
            assert_eq!(totals, expected_totals);
        }
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let votes = count_votes(vec!["최선대".to_string(); 7]);
        let board = aggregate_rankings(sample(), &votes);
        let sum: f64 = board.entries.iter().map(|e| e.vote_percent).sum();

        assert!((sum - 100.0).abs() <= 0.1 * board.entries.len() as f64);
        assert_eq!(board.total_votes, 102);
        assert_eq!(board.entries[0].vote_percent, 39.2);
    }

    #[test]
    fn test_zero_total() {
        let seeds = vec![seed("영어", "가강사", 1, None), seed("영어", "나강사", 2, Some(0))];
        let board = aggregate_rankings(seeds, &HashMap::new());

        assert_eq!(board.total_votes, 0);
        assert!(board.entries.iter().all(|e| e.vote_percent == 0.0));
        assert_eq!(names(&board), vec!["가강사", "나강사"]);
    }

    #[test]
    fn test_views_serialize_camel_case() {
        let board = aggregate_rankings(sample(), &HashMap::new());
        let public = serde_json::to_value(RankingView::from(&board.entries[0])).unwrap();
        assert_eq!(public["instructorName"], json!("김영편"));
        assert_eq!(public["examSlug"], json!("transfer"));

        let admin = serde_json::to_value(AdminRankingView::from(&board.entries[0])).unwrap();
        assert_eq!(admin["initialRank"], json!(1));
        assert_eq!(admin["sourceType"], json!("manual"));
        assert_eq!(admin["isSeed"], json!(true));
    }

    #[test]
    fn test_vote_request_validation() {
        let request: VoteRequest = serde_json::from_value(json!({ "instructorName": "  " })).unwrap();
        assert!(request.validate().is_err());

        let request: VoteRequest = serde_json::from_value(json!({ "instructorName": " 김영편 " })).unwrap();
        assert_eq!(request.validate().unwrap(), "김영편");
    }

    #[test]
    fn test_upsert_defaults() {
        let request: RankingUpsertRequest =
            serde_json::from_value(json!({ "subject": "영어", "instructorName": "신규" })).unwrap();
        let (subject, name) = request.validate().unwrap();

        let fresh = request.resolve(subject.clone(), name.clone(), None, Some(7));
        assert_eq!((fresh.rank, fresh.confidence), (8, 0));

        let kept = request.resolve(subject, name, Some((3, Some(12))), Some(7));
        assert_eq!((kept.rank, kept.confidence), (3, 12));
    }

    #[test]
    fn test_upsert_explicit_values_are_clamped() {
        let request: RankingUpsertRequest = serde_json::from_value(json!({
            "subject": "수학",
            "instructorName": "박미적",
            "initialRank": -3,
            "initialVotes": "12.6"
        }))
        .unwrap();
        let (subject, name) = request.validate().unwrap();
        let resolved = request.resolve(subject, name, Some((2, Some(1))), None);

        assert_eq!((resolved.rank, resolved.confidence), (1, 13));
    }

    #[test]
    fn test_upsert_requires_names() {
        let request: RankingUpsertRequest = serde_json::from_value(json!({ "subject": "영어" })).unwrap();
        assert!(request.validate().is_err());
    }
}
