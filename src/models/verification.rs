use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{char_len, lenient_string, non_empty, parse_uuid, trimmed};
use crate::catalog::ScopedExam;

pub const VERIFICATION_TYPES: [&str; 3] = ["transfer_passer", "cpa_first_passer", "cpa_accountant"];
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub id: Uuid,
    pub profile_id: Option<Uuid>,
    pub requester_name: String,
    pub exam_slug: String,
    pub verification_type: String,
    pub evidence_url: String,
    pub memo: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVerificationRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub requester_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exam_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub verification_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub evidence_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub memo: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
}

/// A pending request ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVerification {
    pub profile_id: Option<Uuid>,
    pub requester_name: String,
    pub exam: ScopedExam,
    pub verification_type: &'static str,
    pub evidence_url: String,
    pub memo: Option<String>,
}

impl CreateVerificationRequest {
    /// Requester and exam come first so the exam gate can run before the rest.
    pub fn requester_and_exam(&self) -> Result<(String, ScopedExam), String> {
        let requester_name = trimmed(&self.requester_name);
        if char_len(&requester_name) < 2 {
            return Err("요청자 이름을 확인해 주세요.".to_string());
        }
        let exam = ScopedExam::parse(&trimmed(&self.exam_slug))
            .ok_or_else(|| "시험 구분이 올바르지 않습니다.".to_string())?;
        Ok((requester_name, exam))
    }

    pub fn validate(&self, requester_name: String, exam: ScopedExam) -> Result<NewVerification, String> {
        let raw_type = trimmed(&self.verification_type);
        if raw_type.is_empty() {
            return Err("인증 유형을 선택해 주세요.".to_string());
        }
        let verification_type = VERIFICATION_TYPES
            .iter()
            .copied()
            .find(|known| *known == raw_type)
            .ok_or_else(|| "지원하지 않는 인증 유형입니다.".to_string())?;

        let evidence_url = trimmed(&self.evidence_url);
        if evidence_url.is_empty() {
            return Err("합격증 이미지를 업로드해 주세요.".to_string());
        }
        if !is_http_url(&evidence_url) {
            return Err("증빙 파일 주소가 올바르지 않습니다.".to_string());
        }

        Ok(NewVerification {
            profile_id: parse_uuid(&trimmed(&self.user_id)),
            requester_name,
            exam,
            verification_type,
            evidence_url,
            memo: non_empty(&self.memo),
        })
    }
}

fn is_http_url(value: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        value
            .get(..scheme.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .unwrap_or(false)
            && value.len() > scheme.len()
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationListQuery {
    pub status: Option<String>,
}

impl VerificationListQuery {
    /// `pending` unless another known status (or `all`) is asked for.
    pub fn status_filter(&self) -> Result<Option<&'static str>, String> {
        match self.status.as_deref().map(str::trim).unwrap_or(STATUS_PENDING) {
            "" | STATUS_PENDING => Ok(Some(STATUS_PENDING)),
            STATUS_APPROVED => Ok(Some(STATUS_APPROVED)),
            STATUS_REJECTED => Ok(Some(STATUS_REJECTED)),
            "all" => Ok(None),
            _ => Err("지원하지 않는 상태값입니다.".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(&self) -> &'static str {
        match self {
            Decision::Approve => STATUS_APPROVED,
            Decision::Reject => STATUS_REJECTED,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub decision: Option<String>,
}

impl DecisionRequest {
    pub fn decision(&self) -> Result<Decision, String> {
        match trimmed(&self.decision).as_str() {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject),
            _ => Err("decision은 approve 또는 reject여야 합니다.".to_string()),
        }
    }
}
