use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::error::ApiError;

/// Roles that may use the admin console.
pub const ADMIN_ROLES: [&str; 2] = ["admin", "moderator"];

impl Database {
    pub async fn has_admin_role(&self, user_id: Uuid) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;
        let roles: Vec<&str> = ADMIN_ROLES.to_vec();
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = ANY($2))",
                &[&user_id, &roles],
            )
            .await?;
        Ok(row.get(0))
    }

    pub async fn grant_role(&self, user_id: Uuid, role: &str) -> Result<(), ApiError> {
        let client = self.get_connection().await?;
        client
            .execute(
                "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id, role) DO NOTHING",
                &[&user_id, &role],
            )
            .await?;

        info!("Granted role '{}' to user {}", role, user_id);
        Ok(())
    }
}
