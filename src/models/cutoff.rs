use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{finite_number, lenient_string, normalize_text, parse_uuid};

pub const RESULT_TYPES: [&str; 3] = ["불합격", "추합", "최초합"];
pub const INPUT_BASES: [&str; 2] = ["wrong", "score"];
pub const DEFAULT_INPUT_BASIS: &str = "wrong";
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1990..=2100;

/// Row as stored; also the public listing shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CutoffScore {
    pub id: Uuid,
    pub exam_slug: String,
    pub university: String,
    pub major: String,
    pub year: i32,
    pub score_band: String,
    pub note: Option<String>,
    #[serde(skip)]
    pub source: Option<String>,
}

/// Admin listing shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CutoffView {
    pub id: Uuid,
    pub exam_slug: String,
    pub university: String,
    pub major: String,
    pub year: i32,
    pub result_type: String,
    pub note: String,
    pub input_basis: String,
}

impl From<CutoffScore> for CutoffView {
    fn from(row: CutoffScore) -> Self {
        CutoffView {
            input_basis: parse_input_basis(row.source.as_deref())
                .unwrap_or(DEFAULT_INPUT_BASIS)
                .to_string(),
            id: row.id,
            exam_slug: row.exam_slug,
            university: row.university,
            major: row.major,
            year: row.year,
            result_type: row.score_band,
            note: row.note.unwrap_or_default(),
        }
    }
}

pub fn parse_result_type(value: Option<&str>) -> Option<&'static str> {
    let value = value?.trim();
    RESULT_TYPES.iter().copied().find(|candidate| *candidate == value)
}

pub fn parse_input_basis(value: Option<&str>) -> Option<&'static str> {
    let value = value?.trim();
    INPUT_BASES.iter().copied().find(|candidate| *candidate == value)
}

/// Rounds and range-checks a reported year.
pub fn parse_year(value: Option<&Value>) -> Option<i32> {
    let year = finite_number(value)?.round();
    if year < f64::from(*YEAR_RANGE.start()) || year > f64::from(*YEAR_RANGE.end()) {
        return None;
    }
    Some(year as i32)
}

/// Exam named in a query or body, defaulting to `transfer`.
pub fn exam_or_default(value: &Option<String>) -> String {
    let exam = normalize_text(value, 20);
    if exam.is_empty() {
        "transfer".to_string()
    } else {
        exam
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CutoffQuery {
    pub exam: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutoffUpsertRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub exam: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub university: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub major: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub input_basis: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub note: Option<String>,
}

/// A cutoff report ready to upsert on `(exam, university, major, year)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoffUpsert {
    pub university: String,
    pub major: String,
    pub year: i32,
    pub result_type: &'static str,
    pub input_basis: &'static str,
    pub note: Option<String>,
}

impl CutoffUpsertRequest {
    pub fn validate(&self) -> Result<CutoffUpsert, String> {
        let university = normalize_text(&self.university, 40);
        let major = normalize_text(&self.major, 40);
        let year = parse_year(self.year.as_ref());
        let result_type = parse_result_type(self.result_type.as_deref());

        match (university.is_empty() || major.is_empty(), year, result_type) {
            (false, Some(year), Some(result_type)) => {
                let note = normalize_text(&self.note, 120);
                Ok(CutoffUpsert {
                    university,
                    major,
                    year,
                    result_type,
                    input_basis: parse_input_basis(self.input_basis.as_deref()).unwrap_or(DEFAULT_INPUT_BASIS),
                    note: Some(note).filter(|note| !note.is_empty()),
                })
            }
            _ => Err("university, major, year, resultType이 필요합니다.".to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CutoffDeleteRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exam: Option<String>,
}

impl CutoffDeleteRequest {
    pub fn id(&self) -> Result<Uuid, String> {
        let raw = normalize_text(&self.id, 80);
        if raw.is_empty() {
            return Err("삭제할 id가 필요합니다.".to_string());
        }
        parse_uuid(&raw).ok_or_else(|| "유효하지 않은 id입니다.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_and_basis_parsing() {
        assert_eq!(parse_result_type(Some(" 추합 ")), Some("추합"));
        assert_eq!(parse_result_type(Some("합격")), None);
        assert_eq!(parse_input_basis(Some("score")), Some("score"));
        assert_eq!(parse_input_basis(Some("rank")), None);
        assert_eq!(parse_input_basis(None), None);
    }

    #[test]
    fn test_year_parsing() {
        assert_eq!(parse_year(Some(&json!(2024.4))), Some(2024));
        assert_eq!(parse_year(Some(&json!("2023"))), Some(2023));
        assert_eq!(parse_year(Some(&json!(1989))), None);
        assert_eq!(parse_year(Some(&json!(2101))), None);
        assert_eq!(parse_year(Some(&json!("올해"))), None);
    }

    #[test]
    fn test_upsert_validation() {
        let request: CutoffUpsertRequest = serde_json::from_value(json!({
            "university": " 한양대 ",
            "major": "경영학과",
            "year": 2025,
            "resultType": "최초합",
            "note": "  "
        }))
        .unwrap();
        let upsert = request.validate().unwrap();
        assert_eq!(upsert.university, "한양대");
        assert_eq!(upsert.input_basis, "wrong");
        assert_eq!(upsert.note, None);

        let missing: CutoffUpsertRequest = serde_json::from_value(json!({
            "university": "한양대",
            "major": "경영학과",
            "year": 2025,
            "resultType": "합격"
        }))
        .unwrap();
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_text_limits() {
        let request = CutoffUpsertRequest {
            university: Some("가".repeat(50)),
            major: Some("나".repeat(50)),
            year: Some(json!(2024)),
            result_type: Some("불합격".to_string()),
            note: Some("다".repeat(200)),
            ..Default::default()
        };
        let upsert = request.validate().unwrap();
        assert_eq!(upsert.university.chars().count(), 40);
        assert_eq!(upsert.note.map(|n| n.chars().count()), Some(120));
    }

    #[test]
    fn test_admin_view() {
        let row = CutoffScore {
            id: Uuid::nil(),
            exam_slug: "transfer".to_string(),
            university: "중앙대".to_string(),
            major: "경영".to_string(),
            year: 2024,
            score_band: "추합".to_string(),
            note: None,
            source: Some("legacy".to_string()),
        };
        let view = serde_json::to_value(CutoffView::from(row.clone())).unwrap();
        assert_eq!(view["resultType"], json!("추합"));
        assert_eq!(view["inputBasis"], json!("wrong"));
        assert_eq!(view["note"], json!(""));

        let public = serde_json::to_value(row).unwrap();
        assert_eq!(public["score_band"], json!("추합"));
        assert!(public.get("source").is_none());
    }

    #[test]
    fn test_delete_request() {
        assert!(CutoffDeleteRequest::default().id().is_err());
        assert_eq!(exam_or_default(&None), "transfer");
        assert_eq!(exam_or_default(&Some(" cpa ".to_string())), "cpa");
    }
}
