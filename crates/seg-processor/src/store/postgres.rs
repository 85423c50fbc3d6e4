//! Postgres-backed segmentation store
//!
//! Each upsert is a single `INSERT .. ON CONFLICT DO UPDATE` statement, so
//! concurrent workers writing the same key cannot race into a duplicate insert.
//! `xmax = 0` on the returned row tells a fresh insert apart from an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seg_common::{Result, SegError};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

use super::{SegmentationStore, StoreError, StoredSegmentation};
use crate::record::{Record, UpsertOutcome};

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 32;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default idle connection lifetime in seconds.
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 30;

const UPSERT_SQL: &str = r#"
    INSERT INTO segmentations (user_id, segmentation_type, segmentation_name, data, created_at, updated_at)
    VALUES ($1, $2, $3, convert_from($4, 'UTF8')::jsonb, $5, $5)
    ON CONFLICT (user_id, segmentation_type, segmentation_name)
    DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
    RETURNING (xmax = 0) AS inserted
"#;

const FIND_BY_USER_SQL: &str = r#"
    SELECT user_id, segmentation_type, segmentation_name, data, created_at, updated_at
    FROM segmentations
    WHERE user_id = $1
    ORDER BY segmentation_type, segmentation_name
"#;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Load from `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`, `DATABASE_CONNECT_TIMEOUT`
    /// and `DATABASE_IDLE_TIMEOUT`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| SegError::Config("DATABASE_URL is not set".to_string()))?;

        Ok(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
            connect_timeout_secs: env_or(
                "DATABASE_CONNECT_TIMEOUT",
                DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            ),
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
        })
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect, verify the database answers, and apply pending migrations
    pub async fn connect(config: &DatabaseConfig) -> std::result::Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        info!("Database connection pool established");

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        info!("Database migrations completed");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All segmentations of one subject, ordered by category then name
    pub async fn find_by_subject(
        &self,
        subject_id: u64,
    ) -> std::result::Result<Vec<StoredSegmentation>, StoreError> {
        let user_id = to_db_id(subject_id)?;
        let rows = sqlx::query(FIND_BY_USER_SQL)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> std::result::Result<StoredSegmentation, StoreError> {
                let user_id: i64 = row.try_get("user_id")?;
                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
                Ok(StoredSegmentation {
                    subject_id: user_id as u64,
                    category: row.try_get("segmentation_type")?,
                    name: row.try_get("segmentation_name")?,
                    payload: row.try_get("data")?,
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }
}

fn to_db_id(subject_id: u64) -> std::result::Result<i64, StoreError> {
    i64::try_from(subject_id).map_err(|_| StoreError::SubjectIdOutOfRange(subject_id))
}

#[async_trait]
impl SegmentationStore for PostgresStore {
    async fn upsert(&self, record: &Record) -> std::result::Result<UpsertOutcome, StoreError> {
        let user_id = to_db_id(record.subject_id())?;

        let inserted: bool = sqlx::query_scalar(UPSERT_SQL)
            .bind(user_id)
            .bind(record.category())
            .bind(record.name())
            .bind(record.payload())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_range() {
        assert_eq!(to_db_id(7).unwrap(), 7);
        assert_eq!(to_db_id(i64::MAX as u64).unwrap(), i64::MAX);
        assert!(matches!(
            to_db_id(u64::MAX),
            Err(StoreError::SubjectIdOutOfRange(u64::MAX))
        ));
    }

    /// Runs only when a scratch database is available.
    #[tokio::test]
    async fn test_upsert_against_database() {
        let Ok(config) = DatabaseConfig::from_env() else {
            return;
        };
        let store = PostgresStore::connect(&config).await.unwrap();
        let subject_id = u32::MAX as u64 + uuid::Uuid::new_v4().as_u128() as u32 as u64;

        let first = Record::new(subject_id, "drug".into(), "Aspirin".into(), br#"{"dose":"500mg"}"#.to_vec());
        let second = Record::new(subject_id, "drug".into(), "Aspirin".into(), br#"{"dose":"1g"}"#.to_vec());

        assert_eq!(store.upsert(&first).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&second).await.unwrap(), UpsertOutcome::Updated);

        let found = store.find_by_subject(subject_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, serde_json::json!({"dose": "1g"}));
    }
}
