//! Repository layer over the hosted Postgres.
//!
//! One `Database` wraps the deadpool pool; each submodule adds the queries for
//! one area as further `impl Database` blocks.

mod briefings;
mod catalog;
mod comments;
mod cutoffs;
mod points;
mod posts;
mod profiles;
mod rankings;
mod roles;
mod verification;

use deadpool_postgres::{Config, Object, Pool, Runtime};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::error::ApiError;

pub use comments::AdoptionRecord;
pub use posts::PostContext;

#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Builds the pool and checks that a connection can be made.
    pub async fn new(config: DatabaseConfig) -> Result<Self, ApiError> {
        info!("Creating PostgreSQL connection pool for host: {}:{}", config.host, config.port);

        let db = Self::lazy(config)?;
        db.test_connection().await?;

        Ok(db)
    }

    /// Builds the pool without opening any connection.
    pub fn lazy(config: DatabaseConfig) -> Result<Self, ApiError> {
        let pool = Self::create_pool(config)?;
        Ok(Database { pool })
    }

    fn create_pool(config: DatabaseConfig) -> Result<Pool, ApiError> {
        let mut pg_config = Config::new();

        pg_config.host = Some(config.host);
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database);
        pg_config.user = Some(config.username);
        pg_config.password = Some(config.password);
        pg_config.connect_timeout = Some(config.connection_timeout);

        pg_config.ssl_mode = Some(match config.ssl_mode.as_str() {
            "disable" => deadpool_postgres::SslMode::Disable,
            "allow" | "prefer" => deadpool_postgres::SslMode::Prefer,
            "require" | "verify-ca" | "verify-full" => deadpool_postgres::SslMode::Require,
            other => {
                warn!("Unknown SSL mode '{}', defaulting to 'require'", other);
                deadpool_postgres::SslMode::Require
            }
        });

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(config.max_connections as usize);
        pool_config.timeouts.wait = Some(config.connection_timeout);
        pool_config.timeouts.create = Some(config.connection_timeout);
        pg_config.pool = Some(pool_config);

        // The hosted database only accepts TLS connections from outside its network
        let tls_connector = TlsConnector::builder().build().map_err(|e| {
            error!("Failed to create TLS connector: {}", e);
            ApiError::Internal(anyhow::anyhow!("TLS connector creation failed: {}", e))
        })?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config.create_pool(Some(Runtime::Tokio1), tls).map_err(|e| {
            error!("Failed to create connection pool: {}", e);
            ApiError::Internal(anyhow::anyhow!("Connection pool creation failed: {}", e))
        })
    }

    async fn get_connection(&self) -> Result<Object, ApiError> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[]).await.map_err(|e| {
            error!("Database health check failed: {}", e);
            ApiError::from(e)
        })?;

        info!("Database health check successful");
        Ok(())
    }

    pub async fn test_connection(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[]).await.map_err(|e| {
            error!("Database connection test failed: {}", e);
            ApiError::from(e)
        })?;

        info!("Database connection test successful");
        Ok(())
    }

    /// Creates the schema when missing. Every statement is idempotent.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        for (name, statement) in MIGRATIONS {
            client.batch_execute(statement).await.map_err(|e| {
                error!("Migration '{}' failed: {}", name, e);
                ApiError::from(e)
            })?;
        }

        info!("Database migrations completed successfully ({} steps)", MIGRATIONS.len());
        Ok(())
    }
}

const MIGRATIONS: &[(&str, &str)] = &[
    ("uuid extension", r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#),
    (
        "profiles",
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id UUID PRIMARY KEY,
            username TEXT UNIQUE,
            display_name TEXT,
            points INTEGER NOT NULL DEFAULT 0,
            verification_level TEXT NOT NULL DEFAULT 'none',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_display_name ON profiles(display_name);
        "#,
    ),
    (
        "user_roles",
        r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            user_id UUID NOT NULL,
            role TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, role)
        )
        "#,
    ),
    (
        "exams and boards",
        r#"
        CREATE TABLE IF NOT EXISTS exams (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE TABLE IF NOT EXISTS boards (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            exam_id UUID NOT NULL REFERENCES exams(id) ON DELETE CASCADE,
            slug TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (exam_id, slug)
        );
        "#,
    ),
    (
        "posts",
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            author_name TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            post_type TEXT NOT NULL DEFAULT 'general',
            view_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_posts_board_created ON posts(board_id, created_at DESC);
        CREATE TABLE IF NOT EXISTS post_likes (
            post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (post_id, user_id)
        );
        "#,
    ),
    (
        "comments",
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            parent_id UUID REFERENCES comments(id) ON DELETE SET NULL,
            author_name TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_comments_post_created ON comments(post_id, created_at);
        CREATE TABLE IF NOT EXISTS answer_adoptions (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            post_id UUID NOT NULL UNIQUE REFERENCES posts(id) ON DELETE CASCADE,
            comment_id UUID NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            adopter_name TEXT NOT NULL,
            selected_author_name TEXT NOT NULL,
            points_awarded INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    ),
    (
        "rankings",
        r#"
        CREATE TABLE IF NOT EXISTS instructor_rankings (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            exam_slug TEXT NOT NULL,
            subject TEXT NOT NULL,
            instructor_name TEXT NOT NULL,
            rank INTEGER NOT NULL,
            trend TEXT NOT NULL DEFAULT '-',
            confidence INTEGER,
            source_type TEXT,
            is_seed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (exam_slug, subject, instructor_name)
        );
        CREATE TABLE IF NOT EXISTS instructor_votes (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            exam_slug TEXT NOT NULL,
            instructor_name TEXT NOT NULL,
            voter_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (exam_slug, voter_name)
        );
        "#,
    ),
    (
        "cutoff_scores",
        r#"
        CREATE TABLE IF NOT EXISTS cutoff_scores (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            exam_slug TEXT NOT NULL,
            university TEXT NOT NULL,
            major TEXT NOT NULL,
            year INTEGER NOT NULL,
            score_band TEXT NOT NULL,
            note TEXT,
            source TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (exam_slug, university, major, year)
        )
        "#,
    ),
    (
        "point_ledger",
        r#"
        CREATE TABLE IF NOT EXISTS point_ledger (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            profile_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
            receiver_name TEXT NOT NULL,
            source TEXT NOT NULL,
            amount INTEGER NOT NULL,
            meta JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_point_ledger_profile ON point_ledger(profile_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_point_ledger_receiver ON point_ledger(receiver_name, created_at DESC);
        "#,
    ),
    (
        "verification_requests",
        r#"
        CREATE TABLE IF NOT EXISTS verification_requests (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            profile_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
            requester_name TEXT NOT NULL,
            exam_slug TEXT NOT NULL,
            verification_type TEXT NOT NULL,
            evidence_url TEXT NOT NULL,
            memo TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            reviewed_at TIMESTAMPTZ
        )
        "#,
    ),
    (
        "daily_briefings",
        r#"
        CREATE TABLE IF NOT EXISTS daily_briefings (
            id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            exam_slug TEXT NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            source_label TEXT,
            published_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_daily_briefings_exam ON daily_briefings(exam_slug, published_at DESC);
        "#,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 2,
            connection_timeout: Duration::from_secs(1),
            run_migrations: false,
            connection_string: None,
        }
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let db = Database::lazy(config()).expect("pool should build without a server");
        assert_eq!(db.pool.status().size, 0);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        for (name, statement) in MIGRATIONS {
            let upper = statement.to_uppercase();
            assert!(
                !upper.contains("CREATE TABLE ") || upper.contains("CREATE TABLE IF NOT EXISTS"),
                "migration '{}' must be re-runnable",
                name
            );
            assert!(!upper.contains("DROP "), "migration '{}' must not drop anything", name);
        }
    }
}
