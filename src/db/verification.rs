use postgres_types::ToSql;
use tokio_postgres::Row;
use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::verification::{Decision, NewVerification, VerificationRequest, STATUS_PENDING};

const VERIFICATION_COLUMNS: &str = "id, profile_id, requester_name, exam_slug, verification_type, evidence_url, memo, status, created_at, reviewed_at";

fn verification_from_row(row: &Row) -> VerificationRequest {
    VerificationRequest {
        id: row.get(0),
        profile_id: row.get(1),
        requester_name: row.get(2),
        exam_slug: row.get(3),
        verification_type: row.get(4),
        evidence_url: row.get(5),
        memo: row.get(6),
        status: row.get(7),
        created_at: row.get(8),
        reviewed_at: row.get(9),
    }
}

impl Database {
    pub async fn create_verification(&self, request: &NewVerification) -> Result<VerificationRequest, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            r#"
            INSERT INTO verification_requests
                (profile_id, requester_name, exam_slug, verification_type, evidence_url, memo, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            VERIFICATION_COLUMNS
        );
        let row = client
            .query_one(
                &query,
                &[
                    &request.profile_id,
                    &request.requester_name,
                    &request.exam.as_str(),
                    &request.verification_type,
                    &request.evidence_url,
                    &request.memo,
                    &STATUS_PENDING,
                ],
            )
            .await?;

        let created = verification_from_row(&row);
        info!("Created verification request {} for {}", created.id, created.requester_name);
        Ok(created)
    }

    /// Requests with the given status (all when `None`), newest first.
    pub async fn list_verifications(&self, status: Option<&str>) -> Result<Vec<VerificationRequest>, ApiError> {
        let client = self.get_connection().await?;

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let mut filter = String::new();
        if let Some(ref status) = status {
            filter.push_str("WHERE status = $1");
            params.push(status);
        }

        let query = format!(
            "SELECT {} FROM verification_requests {} ORDER BY created_at DESC LIMIT 200",
            VERIFICATION_COLUMNS, filter
        );
        let rows = client.query(&query, &params).await?;
        Ok(rows.iter().map(verification_from_row).collect())
    }

    /// Closes a pending request. Approval copies the requested level onto the
    /// linked profile in the same transaction.
    pub async fn decide_verification(&self, id: Uuid, decision: Decision) -> Result<VerificationRequest, ApiError> {
        let mut client = self.get_connection().await?;
        let transaction = client.transaction().await?;

        let query = format!("SELECT {} FROM verification_requests WHERE id = $1 FOR UPDATE", VERIFICATION_COLUMNS);
        let current = transaction
            .query_opt(&query, &[&id])
            .await?
            .map(|row| verification_from_row(&row))
            .ok_or_else(|| ApiError::not_found("인증 요청을 찾을 수 없습니다."))?;

        if current.status != STATUS_PENDING {
            return Err(ApiError::conflict("이미 처리된 인증 요청입니다."));
        }

        if let (Decision::Approve, Some(profile_id)) = (decision, current.profile_id) {
            transaction
                .execute(
                    "UPDATE profiles SET verification_level = $2, updated_at = NOW() WHERE id = $1",
                    &[&profile_id, &current.verification_type],
                )
                .await?;
        }

        let query = format!(
            "UPDATE verification_requests SET status = $2, reviewed_at = NOW() WHERE id = $1 RETURNING {}",
            VERIFICATION_COLUMNS
        );
        let row = transaction.query_one(&query, &[&id, &decision.status()]).await?;
        transaction.commit().await?;

        let decided = verification_from_row(&row);
        info!("Verification request {} marked {}", decided.id, decided.status);
        Ok(decided)
    }
}
