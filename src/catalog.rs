//! Static exam/board catalog and the feature gates applied per exam.

use serde::Serialize;

use crate::config::FeatureFlags;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardInfo {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamInfo {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub boards: &'static [BoardInfo],
}

impl ExamInfo {
    pub fn board(&self, slug: &str) -> Option<&'static BoardInfo> {
        self.boards.iter().find(|board| board.slug == slug)
    }
}

const fn board(slug: &'static str, name: &'static str, description: &'static str) -> BoardInfo {
    BoardInfo { slug, name, description }
}

pub const EXAMS: &[ExamInfo] = &[
    ExamInfo {
        slug: "transfer",
        name: "편입",
        description: "편입 시험 정보, 커트라인, 합격 전략을 한곳에.",
        boards: &[
            board("free", "자유게시판", "수험 생활과 고민 공유"),
            board("qa", "Q&A", "전형/지원 관련 질문 답변"),
            board("study-qa", "학습 Q&A", "영어/수학 문제풀이 질문"),
            board("resources", "자료실", "요약본/기출 정리"),
            board("cutoff", "커트라인 제보", "합격/불합격 점수 공유"),
        ],
    },
    ExamInfo {
        slug: "cpa",
        name: "CPA (회계사)",
        description: "회계사 1·2차 과목별 정보를 한곳에.",
        boards: &[
            board("free", "자유게시판", "수험생 일상과 고민 공유"),
            board("resources", "자료실", "요약본/서브노트/기출 정리"),
            board("qa", "Q&A", "과목별 질문 답변"),
        ],
    },
    ExamInfo {
        slug: "civil-9",
        name: "9급 공무원",
        description: "국가직/지방직 최신 정보와 필수 자료 모음.",
        boards: &[
            board("free", "자유게시판", "수험 생활 정보 공유"),
            board("resources", "기출/자료", "기출 분석/암기노트"),
            board("qa", "Q&A", "과목별 질문과 답변"),
        ],
    },
    ExamInfo {
        slug: "labor",
        name: "노무사",
        description: "노무사 1·2차 대비, 답안 구조 및 실무 팁.",
        boards: &[
            board("free", "자유게시판", "학습 일정과 고민 공유"),
            board("resources", "자료실", "판례/법령 요약"),
            board("qa", "Q&A", "답안 작성 피드백"),
        ],
    },
    ExamInfo {
        slug: "patent",
        name: "변리사",
        description: "특허법·민법 중심 학습 자료 모음.",
        boards: &[
            board("free", "자유게시판", "수험 생활/멘탈 관리"),
            board("resources", "기출/자료", "조문 정리/핵심 판례"),
            board("qa", "Q&A", "문제풀이 질문"),
        ],
    },
];

pub fn find_exam(slug: &str) -> Option<&'static ExamInfo> {
    EXAMS.iter().find(|exam| exam.slug == slug)
}

/// Display name of a board, falling back to the slug itself.
pub fn board_name(exam_slug: &str, board_slug: &str) -> String {
    find_exam(exam_slug)
        .and_then(|exam| exam.board(board_slug))
        .map(|board| board.name.to_string())
        .unwrap_or_else(|| {
            if board_slug == "free" {
                "자유게시판".to_string()
            } else {
                board_slug.to_string()
            }
        })
}

/// Post type stored alongside a post, derived from where it was written.
pub fn board_post_type(board_slug: &str) -> &'static str {
    match board_slug {
        "qa" | "study-qa" => "question",
        "cutoff" => "cutoff",
        _ => "general",
    }
}

/// Exams that carry rankings, cutoffs and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopedExam {
    Transfer,
    Cpa,
}

impl ScopedExam {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "transfer" => Some(ScopedExam::Transfer),
            "cpa" => Some(ScopedExam::Cpa),
            _ => None,
        }
    }

    /// Parses or fails with the usual "unsupported category" validation error.
    pub fn require(value: &str) -> Result<Self, ApiError> {
        Self::parse(value).ok_or_else(|| ApiError::validation("지원하지 않는 시험 카테고리입니다."))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopedExam::Transfer => "transfer",
            ScopedExam::Cpa => "cpa",
        }
    }
}

/// Exam of a ranking, cutoff or verification operation. Only `transfer` and
/// `cpa` carry those features.
pub fn resolve_vote_exam(slug: &str) -> Result<ScopedExam, ApiError> {
    ScopedExam::require(slug)
}

/// What a write gate is guarding; only changes the wording of the refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Post,
    Comment,
    Like,
    Adopt,
    Verification,
}

impl WriteAction {
    fn read_only_message(&self) -> &'static str {
        match self {
            WriteAction::Post => "현재 CPA는 읽기 전용입니다. 게시글 작성은 편입에서 이용해 주세요.",
            WriteAction::Comment => "현재 CPA는 읽기 전용입니다. 댓글 작성은 편입 커뮤니티에서 가능합니다.",
            WriteAction::Like => "현재 CPA는 읽기 전용입니다. 좋아요 기능은 편입에서 이용해 주세요.",
            WriteAction::Adopt => "현재 CPA는 읽기 전용입니다. 답변 채택은 편입 커뮤니티에서 가능합니다.",
            WriteAction::Verification => "현재 CPA는 읽기 전용입니다. 인증 신청은 추후 오픈 예정입니다.",
        }
    }
}

/// Feature-flag checks applied per exam slug.
#[derive(Debug, Clone, Copy)]
pub struct ExamGate<'a> {
    flags: &'a FeatureFlags,
}

impl<'a> ExamGate<'a> {
    pub fn new(flags: &'a FeatureFlags) -> Self {
        ExamGate { flags }
    }

    pub fn is_enabled(&self, exam_slug: &str) -> bool {
        match exam_slug {
            "cpa" => self.flags.enable_cpa,
            "transfer" => self.flags.enable_transfer,
            _ => true,
        }
    }

    /// Disabled exams are reported as missing on read paths.
    pub fn ensure_readable(&self, exam_slug: &str) -> Result<(), ApiError> {
        if self.is_enabled(exam_slug) {
            Ok(())
        } else if exam_slug == "cpa" {
            Err(ApiError::not_found("CPA 서비스 비활성화 상태입니다."))
        } else {
            Err(ApiError::not_found("현재 비활성화된 시험 카테고리입니다."))
        }
    }

    pub fn ensure_writable(&self, exam_slug: &str, action: WriteAction) -> Result<(), ApiError> {
        if !self.is_enabled(exam_slug) {
            return Err(ApiError::forbidden(if exam_slug == "cpa" {
                "현재 CPA 서비스는 비활성화 상태입니다."
            } else {
                "현재 비활성화된 시험 카테고리입니다."
            }));
        }

        if exam_slug == "cpa" && !self.flags.enable_cpa_write {
            return Err(ApiError::forbidden(action.read_only_message()));
        }

        Ok(())
    }

    /// Exams listed by the catalog endpoint.
    pub fn enabled_exams(&self) -> Vec<&'static ExamInfo> {
        EXAMS.iter().filter(|exam| self.is_enabled(exam.slug)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_post_type_derivation() {
        assert_eq!(board_post_type("qa"), "question");
        assert_eq!(board_post_type("study-qa"), "question");
        assert_eq!(board_post_type("cutoff"), "cutoff");
        assert_eq!(board_post_type("free"), "general");
    }

    #[test]
    fn test_board_name_fallbacks() {
        assert_eq!(board_name("cpa", "resources"), "자료실");
        assert_eq!(board_name("unknown", "free"), "자유게시판");
        assert_eq!(board_name("transfer", "misc"), "misc");
    }

    #[test]
    fn test_scoped_exam() {
        assert_eq!(ScopedExam::parse("transfer"), Some(ScopedExam::Transfer));
        assert_eq!(ScopedExam::parse("cpa").map(|e| e.as_str()), Some("cpa"));
        assert!(ScopedExam::parse("labor").is_none());
        assert!(ScopedExam::require("").is_err());
    }

    #[test]
    fn test_cpa_read_only_by_default() {
        let flags = FeatureFlags::default();
        let gate = ExamGate::new(&flags);

        assert!(gate.ensure_readable("cpa").is_ok());
        let err = gate.ensure_writable("cpa", WriteAction::Comment).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(gate.ensure_writable("transfer", WriteAction::Comment).is_ok());
    }

    #[test]
    fn test_cpa_disabled() {
        let flags = FeatureFlags { enable_cpa: false, ..FeatureFlags::default() };
        let gate = ExamGate::new(&flags);

        assert_eq!(gate.ensure_readable("cpa").unwrap_err().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            gate.ensure_writable("cpa", WriteAction::Post).unwrap_err().status_code(),
            StatusCode::FORBIDDEN
        );
        assert!(gate.enabled_exams().iter().all(|exam| exam.slug != "cpa"));
    }

    #[test]
    fn test_cpa_writes_enabled() {
        let flags = FeatureFlags { enable_cpa_write: true, ..FeatureFlags::default() };
        assert!(ExamGate::new(&flags).ensure_writable("cpa", WriteAction::Like).is_ok());
    }
}
