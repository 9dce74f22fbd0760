use tokio_postgres::Row;
use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;
use crate::models::profile::{Profile, VERIFICATION_NONE};

const PROFILE_COLUMNS: &str = "id, username, display_name, points, verification_level";

fn profile_from_row(row: &Row) -> Profile {
    Profile {
        id: row.get(0),
        username: row.get(1),
        display_name: row.get(2),
        points: row.get(3),
        verification_level: row.get(4),
    }
}

impl Database {
    pub async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let row = client.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    pub async fn find_profile_by_display_name(&self, display_name: &str) -> Result<Option<Profile>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "SELECT {} FROM profiles WHERE display_name = $1 ORDER BY created_at ASC LIMIT 1",
            PROFILE_COLUMNS
        );
        let row = client.query_opt(&query, &[&display_name]).await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    pub async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM profiles WHERE username = $1", PROFILE_COLUMNS);
        let row = client.query_opt(&query, &[&username]).await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    /// Id of the profile holding a username, if any.
    pub async fn username_owner(&self, username: &str) -> Result<Option<Uuid>, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_opt("SELECT id FROM profiles WHERE username = $1", &[&username])
            .await?;
        Ok(row.map(|row| row.get(0)))
    }

    /// Whether another profile already uses this display name.
    pub async fn display_name_taken(&self, display_name: &str, excluding: Option<Uuid>) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;
        let row = client
            .query_one(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM profiles
                    WHERE display_name = $1 AND ($2::uuid IS NULL OR id <> $2)
                )
                "#,
                &[&display_name, &excluding],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Profile of a freshly registered account: no points, unverified.
    pub async fn create_profile(&self, id: Uuid, username: &str, display_name: &str) -> Result<Profile, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            r#"
            INSERT INTO profiles (id, username, display_name, points, verification_level)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                display_name = EXCLUDED.display_name,
                points = 0,
                verification_level = EXCLUDED.verification_level,
                updated_at = NOW()
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let row = client
            .query_one(&query, &[&id, &username, &display_name, &VERIFICATION_NONE])
            .await?;

        info!("Created profile {} ({})", id, username);
        Ok(profile_from_row(&row))
    }

    /// Sets username and display name, keeping points and verification.
    pub async fn upsert_profile(&self, id: Uuid, username: &str, display_name: &str) -> Result<Profile, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            r#"
            INSERT INTO profiles (id, username, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                display_name = EXCLUDED.display_name,
                updated_at = NOW()
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let row = client.query_one(&query, &[&id, &username, &display_name]).await?;

        info!("Upserted profile {} ({})", id, username);
        Ok(profile_from_row(&row))
    }

    pub async fn update_display_name(&self, id: Uuid, display_name: &str) -> Result<Option<Profile>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "UPDATE profiles SET display_name = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        );
        let row = client.query_opt(&query, &[&id, &display_name]).await?;

        if row.is_some() {
            info!("Updated display name of profile {}", id);
        }
        Ok(row.as_ref().map(profile_from_row))
    }
}
