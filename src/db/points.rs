use tokio_postgres::Row;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::point::LedgerEntry;

const LEDGER_COLUMNS: &str = "id, receiver_name, source, amount, meta, created_at";

fn entry_from_row(row: &Row) -> LedgerEntry {
    LedgerEntry {
        id: row.get(0),
        receiver_name: row.get(1),
        source: row.get(2),
        amount: row.get(3),
        meta: row.get(4),
        created_at: row.get(5),
    }
}

impl Database {
    pub async fn ledger_by_profile(&self, profile_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "SELECT {} FROM point_ledger WHERE profile_id = $1 ORDER BY created_at DESC LIMIT $2",
            LEDGER_COLUMNS
        );
        let rows = client.query(&query, &[&profile_id, &limit]).await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    pub async fn ledger_by_receiver(&self, receiver_name: &str, limit: i64) -> Result<Vec<LedgerEntry>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "SELECT {} FROM point_ledger WHERE receiver_name = $1 ORDER BY created_at DESC LIMIT $2",
            LEDGER_COLUMNS
        );
        let rows = client.query(&query, &[&receiver_name, &limit]).await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }
}
